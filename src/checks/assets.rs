//! Asset tree organisation

use super::{CheckOutcome, RuleChecker};
use std::path::Path;

const EXPECTED_SUBDIRS: &[&str] = &["textures", "audio", "fonts"];

#[derive(Debug, Clone)]
pub struct AssetDirectoryChecker {
    subdirs: Vec<String>,
}

impl Default for AssetDirectoryChecker {
    fn default() -> Self {
        Self {
            subdirs: EXPECTED_SUBDIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl RuleChecker for AssetDirectoryChecker {
    fn name(&self) -> &str {
        "assets"
    }

    fn check(&self, root: &Path) -> CheckOutcome {
        if !root.is_dir() {
            return CheckOutcome::fail(self.name(), "Assets directory not found");
        }

        let issues = self
            .subdirs
            .iter()
            .filter(|sub| !root.join(sub).is_dir())
            .map(|sub| format!("Expected asset subdirectory not found: {}", sub))
            .collect();

        CheckOutcome::from_issues(self.name(), issues)
    }
}
