//! Test-framework installation with post-install verification

use super::failure_parts;
use crate::config::GateConfig;
use crate::error::DependencyError;
use crate::process::{ProcessRequest, ProcessRunner};
use std::path::PathBuf;
use std::sync::Arc;

/// Ensures the test framework's marker file exists, running the installer
/// script at most once per call when it does not.
pub struct DependencyInstaller {
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl DependencyInstaller {
    pub fn new(config: Arc<GateConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    pub fn marker_path(&self) -> PathBuf {
        self.config.resolve_path(&self.config.test_framework.marker)
    }

    pub fn installer_path(&self) -> PathBuf {
        self.config.resolve_path(&self.config.test_framework.installer)
    }

    pub fn is_installed(&self) -> bool {
        self.marker_path().is_file()
    }

    pub async fn ensure_installed(&self) -> Result<(), DependencyError> {
        if self.is_installed() {
            tracing::debug!(marker = %self.marker_path().display(), "test framework already installed");
            return Ok(());
        }

        let installer = self.installer_path();
        if !installer.is_file() {
            return Err(DependencyError::MissingInstaller { path: installer });
        }

        tracing::info!(installer = %installer.display(), "installing test framework");
        let result = self
            .runner
            .run(
                ProcessRequest::new(&installer)
                    .current_dir(&self.config.project_dir)
                    .timeout_secs(self.config.timeouts.install_secs),
            )
            .await;

        if !result.success() {
            let (kind, reason) = failure_parts(&result);
            return Err(DependencyError::InstallFailed {
                kind,
                reason,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        if !self.is_installed() {
            return Err(DependencyError::InstallVerificationFailed {
                marker: self.marker_path(),
            });
        }

        tracing::info!(duration_ms = result.duration_ms, "test framework installed");
        Ok(())
    }
}
