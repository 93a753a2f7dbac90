//! Line-oriented code-quality heuristics for GDScript sources
//!
//! Rules operate on raw text, one line at a time:
//! - a `print(` statement without a DEBUG/TEST/TEMP marker on the same line
//! - a line longer than [`MAX_LINE_CHARS`] characters
//! - a line carrying both a TODO and a FIXME marker (either alone is allowed)

use super::{CheckOutcome, RuleChecker, display_relative};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const MAX_LINE_CHARS: usize = 120;

const SCRIPT_EXTENSION: &str = "gd";
const DEBUG_PRINT_PREFIX: &str = "print(";
const DEVELOPMENT_MARKERS: &[&str] = &["DEBUG", "TEST", "TEMP"];

#[derive(Debug, Clone)]
pub struct ScriptChecker {
    extension: String,
}

impl Default for ScriptChecker {
    fn default() -> Self {
        Self {
            extension: SCRIPT_EXTENSION.to_string(),
        }
    }
}

impl ScriptChecker {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_scripts(&self, root: &Path) -> (Vec<PathBuf>, Vec<String>) {
        let mut files = Vec::new();
        let mut issues = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            match entry {
                Ok(entry) => {
                    let is_script = entry.file_type().is_file()
                        && entry
                            .path()
                            .extension()
                            .and_then(|e| e.to_str())
                            .is_some_and(|e| e == self.extension);
                    if is_script {
                        files.push(entry.into_path());
                    }
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| display_relative(p, root))
                        .unwrap_or_else(|| root.display().to_string());
                    issues.push(format!("Failed to scan {}: {}", path, err));
                }
            }
        }

        (files, issues)
    }

    /// Issues for one file's contents; `label` names the file in each issue
    pub fn check_source(&self, label: &str, content: &str) -> Vec<String> {
        let mut issues = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line_num = index + 1;
            let upper = line.to_uppercase();

            if is_unmarked_debug_print(line, &upper) {
                issues.push(format!(
                    "{}:{} - Debug print statement without DEBUG/TEST/TEMP marker",
                    label, line_num
                ));
            }

            let length = line.chars().count();
            if length > MAX_LINE_CHARS {
                issues.push(format!(
                    "{}:{} - Line too long ({} characters, limit {})",
                    label, line_num, length, MAX_LINE_CHARS
                ));
            }

            if upper.contains("TODO") && upper.contains("FIXME") {
                issues.push(format!("{}:{} - Combined TODO/FIXME marker", label, line_num));
            }
        }

        issues
    }
}

fn is_unmarked_debug_print(line: &str, upper: &str) -> bool {
    line.trim_start().starts_with(DEBUG_PRINT_PREFIX)
        && !DEVELOPMENT_MARKERS.iter().any(|marker| upper.contains(marker))
}

impl RuleChecker for ScriptChecker {
    fn name(&self) -> &str {
        "code_quality"
    }

    fn check(&self, root: &Path) -> CheckOutcome {
        if !root.is_dir() {
            return CheckOutcome::fail(self.name(), "Scripts directory not found");
        }

        let (files, mut issues) = self.collect_scripts(root);
        tracing::debug!(root = %root.display(), scripts = files.len(), "scanning scripts");

        for path in files {
            let label = display_relative(&path, root);
            match fs::read_to_string(&path) {
                Ok(content) => issues.extend(self.check_source(&label, &content)),
                Err(err) => issues.push(format!("Failed to read {}: {}", label, err)),
            }
        }

        CheckOutcome::from_issues(self.name(), issues)
    }
}
