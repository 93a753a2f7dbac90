//! Essential scene presence

use super::{CheckOutcome, RuleChecker};
use std::path::Path;

const ESSENTIAL_SCENES: &[&str] = &["main/Main.tscn", "main/Game.tscn", "player/Player.tscn"];

/// Verifies a fixed list of scene files under the scenes root.
/// Scene contents are not inspected.
#[derive(Debug, Clone)]
pub struct SceneChecker {
    essential: Vec<String>,
}

impl Default for SceneChecker {
    fn default() -> Self {
        Self::new(ESSENTIAL_SCENES.iter().map(|s| s.to_string()).collect())
    }
}

impl SceneChecker {
    pub fn new(essential: Vec<String>) -> Self {
        Self { essential }
    }
}

impl RuleChecker for SceneChecker {
    fn name(&self) -> &str {
        "scenes"
    }

    fn check(&self, root: &Path) -> CheckOutcome {
        if !root.is_dir() {
            return CheckOutcome::fail(self.name(), "Scenes directory not found");
        }

        let issues = self
            .essential
            .iter()
            .filter(|scene| !root.join(scene).is_file())
            .map(|scene| format!("Essential scene not found: {}", scene))
            .collect();

        CheckOutcome::from_issues(self.name(), issues)
    }
}
