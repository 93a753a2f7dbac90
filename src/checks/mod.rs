//! Rule checkers: read-only scans that turn a filesystem subtree into a
//! pass/fail outcome with human-readable issues.
//!
//! Checkers never mutate the project and do not depend on each other, so they
//! can run in any order or concurrently.

pub mod assets;
pub mod audio;
pub mod build_system;
pub mod scenes;
pub mod scripts;
pub mod structure;

pub use assets::AssetDirectoryChecker;
pub use audio::AudioSubsystemChecker;
pub use build_system::BuildSystemChecker;
pub use scenes::SceneChecker;
pub use scripts::ScriptChecker;
pub use structure::{StructureChecker, StructureManifest};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Result of a single check; `passed` holds exactly when `issues` is empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    name: String,
    passed: bool,
    issues: Vec<String>,
}

impl CheckOutcome {
    pub fn from_issues(name: impl Into<String>, issues: Vec<String>) -> Self {
        Self {
            name: name.into(),
            passed: issues.is_empty(),
            issues,
        }
    }

    pub fn pass(name: impl Into<String>) -> Self {
        Self::from_issues(name, Vec::new())
    }

    pub fn fail(name: impl Into<String>, issue: impl Into<String>) -> Self {
        Self::from_issues(name, vec![issue.into()])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }
}

/// A pure scan over one filesystem root
pub trait RuleChecker: Send + Sync {
    /// Stable identifier used as the outcome name
    fn name(&self) -> &str;

    fn check(&self, root: &Path) -> CheckOutcome;
}

/// Ordered collection of rule checkers, each paired with the root it scans
pub struct CheckerSet {
    checkers: Vec<(Box<dyn RuleChecker>, PathBuf)>,
}

impl CheckerSet {
    pub fn new() -> Self {
        Self { checkers: vec![] }
    }

    pub fn register(&mut self, checker: Box<dyn RuleChecker>, root: impl Into<PathBuf>) {
        self.checkers.push((checker, root.into()));
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.checkers.iter().map(|(c, _)| c.name()).collect()
    }

    /// Run every checker in registration order
    pub fn run_serial(&self) -> Vec<CheckOutcome> {
        self.checkers
            .iter()
            .map(|(checker, root)| run_one(checker.as_ref(), root))
            .collect()
    }

    /// Run every checker on the blocking pool; outcomes keep registration order
    pub async fn run_parallel(self) -> Vec<CheckOutcome> {
        let (names, handles): (Vec<_>, Vec<_>) = self
            .checkers
            .into_iter()
            .map(|(checker, root)| {
                let name = checker.name().to_string();
                let handle = tokio::task::spawn_blocking(move || run_one(checker.as_ref(), &root));
                (name, handle)
            })
            .unzip();

        let joined = futures::future::join_all(handles).await;
        let mut outcomes = Vec::with_capacity(joined.len());
        for (name, joined) in names.into_iter().zip(joined) {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    tracing::error!(checker = %name, error = %err, "checker task panicked");
                    outcomes.push(CheckOutcome::fail(name, format!("checker crashed: {}", err)));
                }
            }
        }
        outcomes
    }
}

impl Default for CheckerSet {
    fn default() -> Self {
        Self::new()
    }
}

fn run_one(checker: &dyn RuleChecker, root: &Path) -> CheckOutcome {
    let start = std::time::Instant::now();
    let outcome = checker.check(root);
    tracing::debug!(
        checker = checker.name(),
        root = %root.display(),
        issues = outcome.issues().len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "checker completed"
    );
    outcome
}

/// Path of `path` relative to `root`, with forward slashes
pub(crate) fn display_relative(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedChecker {
        name: &'static str,
        issues: Vec<String>,
    }

    impl RuleChecker for FixedChecker {
        fn name(&self) -> &str {
            self.name
        }

        fn check(&self, _root: &Path) -> CheckOutcome {
            CheckOutcome::from_issues(self.name, self.issues.clone())
        }
    }

    fn set() -> CheckerSet {
        let mut set = CheckerSet::new();
        set.register(
            Box::new(FixedChecker {
                name: "first",
                issues: vec![],
            }),
            "/a",
        );
        set.register(
            Box::new(FixedChecker {
                name: "second",
                issues: vec!["broken".to_string()],
            }),
            "/b",
        );
        set
    }

    #[test]
    fn outcome_passes_only_without_issues() {
        assert!(CheckOutcome::pass("x").passed());
        assert!(!CheckOutcome::fail("x", "bad").passed());
        assert!(!CheckOutcome::from_issues("x", vec!["a".into(), "b".into()]).passed());
    }

    #[test]
    fn serial_run_keeps_order() {
        let outcomes = set().run_serial();
        let names: Vec<_> = outcomes.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(outcomes[0].passed());
        assert!(!outcomes[1].passed());
    }

    #[tokio::test]
    async fn parallel_run_matches_serial() {
        let serial = set().run_serial();
        let parallel = set().run_parallel().await;
        assert_eq!(serial, parallel);
    }

    #[test]
    fn relative_display_uses_forward_slashes() {
        let root = PathBuf::from("/proj/scripts");
        let file = root.join("player").join("Player.gd");
        assert_eq!(display_relative(&file, &root), "player/Player.gd");
    }
}
