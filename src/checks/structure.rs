//! Required project layout

use super::{CheckOutcome, RuleChecker};
use std::path::Path;

const REQUIRED_DIRECTORIES: &[&str] = &[
    "scenes",
    "scenes/main",
    "scenes/player",
    "scenes/enemies",
    "scenes/projectiles",
    "scenes/pickups",
    "scenes/menus",
    "scripts",
    "scripts/autoloads",
    "scripts/main",
    "scripts/player",
    "scripts/enemies",
    "scripts/projectiles",
    "scripts/pickups",
    "scripts/menus",
    "assets",
    "test",
    "test/unit",
    "test/integration",
];

const REQUIRED_FILES: &[&str] = &[
    "project.godot",
    "run_tests.sh",
    "CLAUDE.md",
    "README.md",
    "LICENSE.md",
];

/// Directories and files that must exist under the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureManifest {
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

impl StructureManifest {
    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StructureManifest {
    fn default() -> Self {
        Self {
            directories: REQUIRED_DIRECTORIES.iter().map(|d| d.to_string()).collect(),
            files: REQUIRED_FILES.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Reports one issue per missing manifest entry, in manifest order
#[derive(Debug, Clone, Default)]
pub struct StructureChecker {
    manifest: StructureManifest,
}

impl StructureChecker {
    pub fn new(manifest: StructureManifest) -> Self {
        Self { manifest }
    }
}

impl RuleChecker for StructureChecker {
    fn name(&self) -> &str {
        "structure"
    }

    fn check(&self, root: &Path) -> CheckOutcome {
        let mut issues = Vec::new();

        for dir in &self.manifest.directories {
            if !root.join(dir).is_dir() {
                issues.push(format!("Missing directory: {}", dir));
            }
        }

        for file in &self.manifest.files {
            if !root.join(file).is_file() {
                issues.push(format!("Missing file: {}", file));
            }
        }

        CheckOutcome::from_issues(self.name(), issues)
    }
}
