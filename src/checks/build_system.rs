//! Toolchain health: build tool, engine executable, scratch space, test runner

use super::CheckOutcome;
use crate::config::GateConfig;
use crate::engine::Engine;
use crate::error::FailureKind;
use crate::process::{ProcessRequest, ProcessRunner, resolve_executable};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const PROBE_DIR: &str = "build_probe";

/// Unlike the rule checkers this one launches subprocesses, so it is async and
/// owns a runner.
pub struct BuildSystemChecker {
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl BuildSystemChecker {
    pub fn new(config: Arc<GateConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    pub fn name(&self) -> &str {
        "build_system"
    }

    pub async fn check(&self) -> CheckOutcome {
        let mut issues = Vec::new();

        if let Some(issue) = self.check_build_tool().await {
            issues.push(issue);
        }
        if let Some(issue) = self.check_engine().await {
            issues.push(issue);
        }
        if let Some(issue) = self.check_temp_dir() {
            issues.push(issue);
        }
        if let Some(issue) = self.check_test_runner() {
            issues.push(issue);
        }

        CheckOutcome::from_issues(self.name(), issues)
    }

    async fn check_build_tool(&self) -> Option<String> {
        let tool = self.config.build_tool.display().to_string();
        let result = self
            .runner
            .run(
                ProcessRequest::new(&self.config.build_tool)
                    .arg("--version")
                    .timeout_secs(self.config.timeouts.build_tool_secs),
            )
            .await;

        match result.failure_kind() {
            None => None,
            Some(FailureKind::Launch) => Some(format!("{} not found in PATH", tool)),
            Some(_) => Some(format!(
                "{} not properly installed ({})",
                tool,
                result.failure_reason().unwrap_or_default()
            )),
        }
    }

    async fn check_engine(&self) -> Option<String> {
        let configured = &self.config.godot_executable;
        let Some(executable) = resolve_executable(configured) else {
            return Some(format!("Godot executable not found: {}", configured.display()));
        };

        let engine = Engine::new(executable, &self.config.project_dir);
        match engine
            .query_version(
                self.runner.as_ref(),
                &self.config.expected_engine_version,
                self.config.timeouts.version_secs,
            )
            .await
        {
            Ok(_) => None,
            Err(err) => Some(format!("Godot executable did not report a version: {}", err)),
        }
    }

    fn check_temp_dir(&self) -> Option<String> {
        // never create the project root itself
        if !self.config.project_dir.is_dir() {
            return Some(format!(
                "Cannot create build directories: project directory {} not found",
                self.config.project_dir.display()
            ));
        }
        let probe = self.config.temp_dir().join(PROBE_DIR);
        if let Err(err) = fs::create_dir_all(&probe) {
            return Some(format!(
                "Cannot create build directories under {}: {}",
                self.config.layout.temp_dir.display(),
                err
            ));
        }
        if let Err(err) = fs::remove_dir(&probe) {
            tracing::warn!(path = %probe.display(), error = %err, "failed to remove probe directory");
        }
        None
    }

    fn check_test_runner(&self) -> Option<String> {
        let script = self.config.resolve_path(&self.config.test_runner_script);
        let label = self.config.test_runner_script.display();
        if !script.is_file() {
            return Some(format!("Test runner script missing: {}", label));
        }
        if !is_executable(&script) {
            return Some(format!("Test runner script not executable: {}", label));
        }
        None
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
