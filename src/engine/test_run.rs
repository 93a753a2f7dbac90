//! Test orchestration: dependencies, asset import, test execution, report
//!
//! The sequence is linear. Only a dependency failure stops it early; a failed
//! asset import is logged and the tests run against whatever was imported
//! before.

use super::deps::DependencyInstaller;
use super::Engine;
use crate::config::GateConfig;
use crate::error::TestError;
use crate::process::{ProcessResult, ProcessRunner};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Output lines surfaced in logs when a run fails
const FAILURE_TAIL_LINES: usize = 20;
const REPORT_HISTORY: &str = "10";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRunConfig {
    /// Suite or test name; `None` runs the configured default suite
    pub filter: Option<String>,
    pub generate_report: bool,
}

/// Progress markers, recorded in the order reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestRunStage {
    DependenciesEnsured,
    AssetsImported,
    TestsExecuted,
    ReportGenerated,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub passed: bool,
    pub raw_output: String,
    pub report_path: Option<PathBuf>,
    /// Set when the import step failed and the run continued anyway
    pub import_warning: Option<String>,
    pub stages: Vec<TestRunStage>,
    #[serde(skip)]
    pub result: ProcessResult,
}

impl TestReport {
    pub fn failure_tail(&self) -> Vec<String> {
        self.result.tail_lines(FAILURE_TAIL_LINES)
    }
}

pub struct TestOrchestrator {
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
    installer: DependencyInstaller,
    engine: Engine,
}

impl TestOrchestrator {
    pub fn new(config: Arc<GateConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        let installer = DependencyInstaller::new(config.clone(), runner.clone());
        let engine = Engine::from_config(&config);
        Self {
            config,
            runner,
            installer,
            engine,
        }
    }

    pub async fn run_tests(&self, run: &TestRunConfig) -> Result<TestReport, TestError> {
        let mut stages = Vec::with_capacity(4);

        self.installer.ensure_installed().await?;
        stages.push(TestRunStage::DependenciesEnsured);

        let import = self
            .engine
            .import_assets(self.runner.as_ref(), self.config.timeouts.import_secs)
            .await;
        let import_warning = import.failure_reason();
        stages.push(TestRunStage::AssetsImported);

        let suite = run
            .filter
            .as_deref()
            .unwrap_or(self.config.test_framework.default_suite.as_str());
        let mut request = self
            .engine
            .headless()
            .args(["-s", self.config.test_framework.entry_point.as_str()])
            .arg("--ignoreHeadlessMode")
            .args(["-a", suite])
            .timeout_secs(self.config.timeouts.tests_secs);

        let report_dir = if run.generate_report {
            let dir = self.config.reports_dir();
            match fs::create_dir_all(&dir) {
                Ok(()) => {
                    request = request
                        .args(["-rd", dir.display().to_string().as_str()])
                        .args(["-rc", REPORT_HISTORY]);
                    let existing = report_entries(&dir);
                    Some((dir, existing))
                }
                Err(err) => {
                    tracing::warn!(path = %dir.display(), error = %err, "cannot create reports directory, running without report");
                    None
                }
            }
        } else {
            None
        };

        tracing::info!(suite = %suite, "running tests");
        let result = self.runner.run(request).await;
        stages.push(TestRunStage::TestsExecuted);

        let passed = result.success();
        if passed {
            tracing::info!(duration_ms = result.duration_ms, "all tests passed");
        } else {
            tracing::error!(
                reason = %result.failure_reason().unwrap_or_default(),
                "tests failed"
            );
            for line in result.tail_lines(FAILURE_TAIL_LINES) {
                tracing::error!("  {}", line);
            }
        }

        // earlier runs leave history behind, so only a new entry counts
        let report_path = report_dir.and_then(|(dir, before)| {
            let produced = report_entries(&dir).difference(&before).next().is_some();
            if !produced {
                tracing::warn!(path = %dir.display(), "test run produced no report");
            }
            produced.then_some(dir)
        });
        if report_path.is_some() {
            stages.push(TestRunStage::ReportGenerated);
        }

        Ok(TestReport {
            passed,
            raw_output: result.combined_output(),
            report_path,
            import_warning,
            stages,
            result,
        })
    }
}

fn report_entries(dir: &Path) -> BTreeSet<OsString> {
    fs::read_dir(dir)
        .map(|entries| entries.flatten().map(|entry| entry.file_name()).collect())
        .unwrap_or_default()
}
