//! Error taxonomy for gate components
//!
//! Every orchestration step reports one of a small set of failure kinds so the
//! CLI can print a concise cause and the aggregator can fold the outcome into a
//! category result. Component errors never escape their own boundary as panics.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification shared by all component errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Executable missing or could not be spawned
    Launch,
    /// Process exceeded its time budget (or was cancelled)
    Timeout,
    /// Process ran and signaled failure
    NonZeroExit,
    /// Filesystem read/write failure
    Io,
    /// Expected file or directory absent
    MissingArtifact,
    /// Post-install verification failed
    VerificationFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Launch => "launch error",
            FailureKind::Timeout => "timeout",
            FailureKind::NonZeroExit => "non-zero exit",
            FailureKind::Io => "i/o error",
            FailureKind::MissingArtifact => "missing artifact",
            FailureKind::VerificationFailed => "verification failed",
        };
        f.write_str(label)
    }
}

/// Engine probing failures
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine version query failed ({kind}): {reason}")]
    VersionUnavailable { kind: FailureKind, reason: String },

    #[error("engine printed no version string")]
    EmptyVersion,
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            EngineError::VersionUnavailable { kind, .. } => *kind,
            EngineError::EmptyVersion => FailureKind::VerificationFailed,
        }
    }
}

/// Test-framework installation failures
#[derive(Debug, Error)]
pub enum DependencyError {
    /// The installer script is not where the layout says it should be
    #[error("test framework is not installed and installer script {path:?} is missing")]
    MissingInstaller { path: PathBuf },

    /// Installer exited non-zero, timed out, or could not be launched
    #[error("test framework installer failed ({kind}): {reason}")]
    InstallFailed {
        kind: FailureKind,
        reason: String,
        stdout: String,
        stderr: String,
    },

    /// Installer reported success but the marker file never appeared
    #[error("installer reported success but marker {marker:?} is still missing")]
    InstallVerificationFailed { marker: PathBuf },
}

impl DependencyError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DependencyError::MissingInstaller { .. } => FailureKind::MissingArtifact,
            DependencyError::InstallFailed { kind, .. } => *kind,
            DependencyError::InstallVerificationFailed { .. } => FailureKind::VerificationFailed,
        }
    }
}

/// Engine export failures
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to prepare output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write export presets {path:?}: {source}")]
    Presets {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export of preset '{preset}' failed ({kind}): {reason}")]
    Engine {
        preset: String,
        kind: FailureKind,
        reason: String,
        stdout: String,
        stderr: String,
    },
}

impl ExportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExportError::OutputDir { .. } | ExportError::Presets { .. } => FailureKind::Io,
            ExportError::Engine { kind, .. } => *kind,
        }
    }
}

/// Test orchestration failures that stop a run before tests execute
#[derive(Debug, Error)]
pub enum TestError {
    #[error("missing test dependencies: {0}")]
    MissingDependencies(#[from] DependencyError),
}

impl TestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TestError::MissingDependencies(inner) => inner.kind(),
        }
    }
}

/// Checksum manifest persistence failures
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("failed to write checksum manifest {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize checksum manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ChecksumError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::Io
    }
}
