//! Runs every check category against a project root and folds the outcomes
//! into one verdict. No category short-circuits another.

pub mod report;

pub use report::{render_json, render_markdown, render_text};

use crate::checks::{
    AssetDirectoryChecker, AudioSubsystemChecker, BuildSystemChecker, CheckOutcome, CheckerSet,
    SceneChecker, ScriptChecker, StructureChecker,
};
use crate::config::GateConfig;
use crate::engine::{ExportOrchestrator, TestOrchestrator, TestRunConfig};
use crate::process::ProcessRunner;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Category names in reporting order
pub const CATEGORIES: &[&str] = &[
    "structure",
    "code_quality",
    "assets",
    "scenes",
    "audio",
    "project",
    "tests",
    "build_system",
];

/// Lines of test output carried into the tests category on failure
const TEST_OUTPUT_ISSUE_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryResult {
    pub category: String,
    pub outcome: CheckOutcome,
}

impl CategoryResult {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub results: Vec<CategoryResult>,
    pub overall_passed: bool,
    pub duration_ms: u64,
}

impl ValidationSummary {
    fn new(results: Vec<CategoryResult>, duration_ms: u64) -> Self {
        let overall_passed = results.iter().all(CategoryResult::passed);
        Self {
            results,
            overall_passed,
            duration_ms,
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategoryResult> {
        self.results.iter().find(|r| r.category == name)
    }

    pub fn failed(&self) -> impl Iterator<Item = &CategoryResult> {
        self.results.iter().filter(|r| !r.passed())
    }
}

pub struct ValidationAggregator {
    config: Arc<GateConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl ValidationAggregator {
    pub fn new(config: Arc<GateConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    pub async fn run_all(&self, root: &Path) -> ValidationSummary {
        let start = Instant::now();
        let config = Arc::new(self.config.rooted_at(root));
        tracing::info!(root = %root.display(), parallel = config.parallel_checks, "starting validation");

        let checkers = rule_checkers(&config);
        let rule_outcomes = if config.parallel_checks {
            checkers.run_parallel().await
        } else {
            checkers.run_serial()
        };

        let mut outcomes = rule_outcomes;
        outcomes.push(ExportOrchestrator::new(config.clone(), self.runner.clone()).validate_project());
        outcomes.push(self.run_tests_category(&config).await);
        outcomes.push(
            BuildSystemChecker::new(config.clone(), self.runner.clone())
                .check()
                .await,
        );

        let results: Vec<CategoryResult> = outcomes
            .into_iter()
            .map(|outcome| CategoryResult {
                category: outcome.name().to_string(),
                outcome,
            })
            .collect();

        let summary = ValidationSummary::new(results, start.elapsed().as_millis() as u64);
        for result in summary.failed() {
            tracing::warn!(
                category = %result.category,
                issues = result.outcome.issues().len(),
                "category failed"
            );
        }
        tracing::info!(
            passed = summary.overall_passed,
            duration_ms = summary.duration_ms,
            "validation completed"
        );
        summary
    }

    async fn run_tests_category(&self, config: &Arc<GateConfig>) -> CheckOutcome {
        let orchestrator = TestOrchestrator::new(config.clone(), self.runner.clone());
        match orchestrator.run_tests(&TestRunConfig::default()).await {
            Ok(report) if report.passed => CheckOutcome::pass("tests"),
            Ok(report) => {
                let mut issues = vec![format!(
                    "Test run failed: {}",
                    report.result.failure_reason().unwrap_or_default()
                )];
                issues.extend(report.result.tail_lines(TEST_OUTPUT_ISSUE_LINES));
                CheckOutcome::from_issues("tests", issues)
            }
            Err(err) => CheckOutcome::fail("tests", err.to_string()),
        }
    }
}

/// Read-only checkers in category order, each bound to its root
fn rule_checkers(config: &GateConfig) -> CheckerSet {
    let mut set = CheckerSet::new();
    set.register(Box::new(StructureChecker::default()), &config.project_dir);
    set.register(Box::new(ScriptChecker::default()), config.scripts_dir());
    set.register(Box::new(AssetDirectoryChecker::default()), config.assets_dir());
    set.register(Box::new(SceneChecker::default()), config.scenes_dir());
    set.register(Box::new(AudioSubsystemChecker::default()), config.scripts_dir());
    set
}
