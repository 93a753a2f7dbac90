//! Procedural audio autoload presence and surface

use super::{CheckOutcome, RuleChecker};
use std::fs;
use std::path::{Path, PathBuf};

const AUTOLOAD_SCRIPT: &str = "autoloads/SynthSoundManager.gd";
const REQUIRED_FUNCTIONS: &[&str] = &[
    "generate_sound",
    "play_sound",
    "create_laser_shot",
    "create_explosion",
];

/// Checks the sound manager autoload exists under the scripts root and
/// declares every required function (`func <name>` textual match).
#[derive(Debug, Clone)]
pub struct AudioSubsystemChecker {
    autoload: PathBuf,
    required_functions: Vec<String>,
}

impl Default for AudioSubsystemChecker {
    fn default() -> Self {
        Self {
            autoload: PathBuf::from(AUTOLOAD_SCRIPT),
            required_functions: REQUIRED_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl AudioSubsystemChecker {
    pub fn new(autoload: impl Into<PathBuf>, required_functions: Vec<String>) -> Self {
        Self {
            autoload: autoload.into(),
            required_functions,
        }
    }

    fn autoload_name(&self) -> String {
        self.autoload
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.autoload.display().to_string())
    }
}

impl RuleChecker for AudioSubsystemChecker {
    fn name(&self) -> &str {
        "audio"
    }

    fn check(&self, root: &Path) -> CheckOutcome {
        if !root.is_dir() {
            return CheckOutcome::fail(self.name(), "Scripts directory not found");
        }

        let script = root.join(&self.autoload);
        let name = self.autoload_name();
        if !script.is_file() {
            return CheckOutcome::fail(
                self.name(),
                format!("{} not found - procedural audio system missing", name),
            );
        }

        let content = match fs::read_to_string(&script) {
            Ok(content) => content,
            Err(err) => {
                return CheckOutcome::fail(
                    self.name(),
                    format!("Failed to read {}: {}", name, err),
                );
            }
        };

        let issues = self
            .required_functions
            .iter()
            .filter(|func| !content.contains(&format!("func {}", func)))
            .map(|func| format!("{} missing function: {}", name, func))
            .collect();

        CheckOutcome::from_issues(self.name(), issues)
    }
}
