//! Headless Godot engine invocations and the orchestrators built on them
//!
//! The engine is an opaque executable: every call goes through
//! [`ProcessRunner`] as `<exe> --path <project> --headless <mode flags>`.

pub mod deps;
pub mod export;
pub mod presets;
pub mod test_run;

pub use deps::DependencyInstaller;
pub use export::{ExportOrchestrator, ExportTarget};
pub use test_run::{TestOrchestrator, TestReport, TestRunConfig, TestRunStage};

use crate::config::GateConfig;
use crate::error::{EngineError, FailureKind};
use crate::process::{ProcessRequest, ProcessResult, ProcessRunner};
use std::path::{Path, PathBuf};

/// Reported engine version and whether it carries the expected major prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVersion {
    pub raw: String,
    pub matches_expected: bool,
}

/// Handle on the engine executable bound to one project directory
#[derive(Debug, Clone)]
pub struct Engine {
    executable: PathBuf,
    project_dir: PathBuf,
}

impl Engine {
    pub fn new(executable: impl Into<PathBuf>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            project_dir: project_dir.into(),
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(&config.godot_executable, &config.project_dir)
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// `<exe> --path <project> --headless`, run from the project directory
    pub fn headless(&self) -> ProcessRequest {
        ProcessRequest::new(&self.executable)
            .arg("--path")
            .arg(self.project_dir.display().to_string())
            .arg("--headless")
            .current_dir(&self.project_dir)
    }

    /// Runs `<exe> --version` and compares it with `expected_prefix`.
    /// A mismatch is logged, not returned as an error.
    pub async fn query_version(
        &self,
        runner: &dyn ProcessRunner,
        expected_prefix: &str,
        timeout_secs: u64,
    ) -> Result<EngineVersion, EngineError> {
        let result = runner
            .run(
                ProcessRequest::new(&self.executable)
                    .arg("--version")
                    .timeout_secs(timeout_secs),
            )
            .await;

        if let Some(kind) = result.failure_kind() {
            return Err(EngineError::VersionUnavailable {
                kind,
                reason: result.failure_reason().unwrap_or_default(),
            });
        }

        let raw = result.stdout.trim().to_string();
        if raw.is_empty() {
            return Err(EngineError::EmptyVersion);
        }

        let matches_expected = raw.starts_with(expected_prefix);
        if matches_expected {
            tracing::info!(version = %raw, "found Godot");
        } else {
            tracing::warn!(
                version = %raw,
                expected = %expected_prefix,
                "unexpected Godot major version"
            );
        }

        Ok(EngineVersion {
            raw,
            matches_expected,
        })
    }

    /// Opens the project headless so the editor imports assets, then quits
    pub async fn import_assets(&self, runner: &dyn ProcessRunner, timeout_secs: u64) -> ProcessResult {
        tracing::info!(project = %self.project_dir.display(), "importing project assets");
        let result = runner
            .run(
                self.headless()
                    .args(["--quit-after", "1"])
                    .timeout_secs(timeout_secs),
            )
            .await;

        match result.failure_kind() {
            None => tracing::info!(duration_ms = result.duration_ms, "asset import successful"),
            Some(kind) => tracing::warn!(
                kind = %kind,
                reason = %result.failure_reason().unwrap_or_default(),
                "asset import failed"
            ),
        }
        result
    }
}

/// Failure kind and reason of an unsuccessful process, for error construction
pub(crate) fn failure_parts(result: &ProcessResult) -> (FailureKind, String) {
    (
        result.failure_kind().unwrap_or(FailureKind::NonZeroExit),
        result.failure_reason().unwrap_or_default(),
    )
}
