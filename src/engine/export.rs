//! Engine exports, one preset at a time

use super::presets::{self, DEFAULT_PRESETS};
use super::{Engine, failure_parts};
use crate::checks::CheckOutcome;
use crate::config::GateConfig;
use crate::error::ExportError;
use crate::process::ProcessRunner;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Files that must exist before an export is worth attempting
const PROJECT_FILES: &[&str] = &["project.godot", "scenes/main/Main.tscn", "scenes/main/Game.tscn"];

/// A single export request; relative output paths resolve against the project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub preset_name: String,
    pub output_path: PathBuf,
    pub debug: bool,
}

impl ExportTarget {
    pub fn new(preset_name: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            preset_name: preset_name.into(),
            output_path: output_path.into(),
            debug: false,
        }
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn mode_flag(&self) -> &'static str {
        if self.debug { "--export-debug" } else { "--export-release" }
    }
}

pub struct ExportOrchestrator {
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
    engine: Engine,
}

impl ExportOrchestrator {
    pub fn new(config: Arc<GateConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        let engine = Engine::from_config(&config);
        Self { config, runner, engine }
    }

    /// Targets for every built-in preset, named after the configured artifact
    pub fn default_targets(&self, debug: bool) -> Vec<ExportTarget> {
        DEFAULT_PRESETS
            .iter()
            .map(|preset| {
                ExportTarget::new(preset.name, preset.output_path(&self.config.artifact_name))
                    .debug(debug)
            })
            .collect()
    }

    /// Writes the default presets file if the project has none
    pub fn prepare(&self) -> Result<bool, ExportError> {
        presets::ensure_presets(&self.config.project_dir, &self.config.artifact_name)
    }

    /// Structural prerequisites for exporting, as a check outcome
    pub fn validate_project(&self) -> CheckOutcome {
        let issues = PROJECT_FILES
            .iter()
            .filter(|file| !self.config.resolve_path(file).is_file())
            .map(|file| format!("Missing project file: {}", file))
            .collect();
        CheckOutcome::from_issues("project", issues)
    }

    pub async fn export(&self, target: &ExportTarget) -> Result<(), ExportError> {
        let output = self.config.resolve_path(&target.output_path);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|source| ExportError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        tracing::info!(
            preset = %target.preset_name,
            output = %output.display(),
            debug = target.debug,
            "exporting"
        );

        let request = self
            .engine
            .headless()
            .arg(target.mode_flag())
            .arg(target.preset_name.as_str())
            .arg(output.display().to_string())
            .timeout_secs(self.config.timeouts.export_secs);
        let result = self.runner.run(request).await;

        if !result.success() {
            let (kind, reason) = failure_parts(&result);
            return Err(ExportError::Engine {
                preset: target.preset_name.clone(),
                kind,
                reason,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        tracing::info!(
            preset = %target.preset_name,
            duration_ms = result.duration_ms,
            "export completed"
        );
        Ok(())
    }

    /// Exports every target, continuing past failures; returns the failures
    pub async fn export_all(&self, targets: &[ExportTarget]) -> Vec<ExportError> {
        let mut failures = Vec::new();
        for target in targets {
            if let Err(err) = self.export(target).await {
                tracing::error!(preset = %target.preset_name, error = %err, "export failed");
                failures.push(err);
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::ScriptedRunner;
    use crate::error::FailureKind;
    use crate::process::ProcessResult;
    use std::path::Path;

    fn orchestrator(dir: &Path, runner: Arc<ScriptedRunner>) -> ExportOrchestrator {
        ExportOrchestrator::new(Arc::new(GateConfig::for_project(dir)), runner)
    }

    #[tokio::test]
    async fn release_export_uses_argument_template() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ProcessResult::exited(0, "", "")]));
        let target = ExportTarget::new("Desktop", "build/out/game-linux");

        orchestrator(dir.path(), runner.clone()).export(&target).await.unwrap();

        assert!(dir.path().join("build/out").is_dir());
        let request = runner.request(0);
        let output = dir.path().join("build/out/game-linux").display().to_string();
        assert_eq!(
            request.args,
            vec![
                "--path".to_string(),
                dir.path().display().to_string(),
                "--headless".to_string(),
                "--export-release".to_string(),
                "Desktop".to_string(),
                output,
            ]
        );
        assert_eq!(request.timeout.as_secs(), 300);
    }

    #[tokio::test]
    async fn debug_flag_selects_debug_export() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::default());
        let target = ExportTarget::new("macOS", "build/game.zip").debug(true);
        orchestrator(dir.path(), runner.clone()).export(&target).await.unwrap();
        assert!(runner.request(0).args.contains(&"--export-debug".to_string()));
    }

    #[tokio::test]
    async fn engine_failure_carries_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![ProcessResult::timeout()]));
        let err = orchestrator(dir.path(), runner)
            .export(&ExportTarget::new("Desktop", "build/game"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert!(err.to_string().contains("Desktop"));
    }

    #[tokio::test]
    async fn export_all_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new(vec![
            ProcessResult::exited(1, "", "missing template"),
            ProcessResult::exited(0, "", ""),
            ProcessResult::exited(0, "", ""),
        ]));
        let orchestrator = orchestrator(dir.path(), runner.clone());
        let targets = orchestrator.default_targets(false);
        let failures = orchestrator.export_all(&targets).await;

        assert_eq!(runner.calls(), 3);
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], ExportError::Engine { preset, .. } if preset == "Desktop"));
    }

    #[test]
    fn default_targets_follow_artifact_name() {
        let dir = tempfile::tempdir().unwrap();
        let targets = orchestrator(dir.path(), Arc::new(ScriptedRunner::default())).default_targets(true);
        let outputs: Vec<_> = targets.iter().map(|t| t.output_path.clone()).collect();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("build/game-linux"),
                PathBuf::from("build/game-windows.exe"),
                PathBuf::from("build/game-macos.zip"),
            ]
        );
        assert!(targets.iter().all(|t| t.debug));
    }

    #[test]
    fn validate_project_lists_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("project.godot"), "").unwrap();
        let outcome = orchestrator(dir.path(), Arc::new(ScriptedRunner::default())).validate_project();
        assert_eq!(outcome.name(), "project");
        assert_eq!(
            outcome.issues(),
            [
                "Missing project file: scenes/main/Main.tscn",
                "Missing project file: scenes/main/Game.tscn",
            ]
        );
    }
}
