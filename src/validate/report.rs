//! Validation summary renderers: terminal text, JSON, markdown

use super::ValidationSummary;
use chrono::Utc;

/// Issues listed per failing category before the remainder is elided
const MAX_LISTED_ISSUES: usize = 10;

pub fn render_text(summary: &ValidationSummary) -> String {
    let mut out = String::new();
    out.push_str("Validation Results\n");
    out.push_str(&format!("{}\n", "=".repeat(50)));

    for result in &summary.results {
        let status = if result.passed() { "PASS" } else { "FAIL" };
        out.push_str(&format!("{:<20} {}\n", result.category, status));

        if !result.passed() {
            let issues = result.outcome.issues();
            for issue in issues.iter().take(MAX_LISTED_ISSUES) {
                out.push_str(&format!("  - {}\n", issue));
            }
            if issues.len() > MAX_LISTED_ISSUES {
                out.push_str(&format!(
                    "  ... and {} more issues\n",
                    issues.len() - MAX_LISTED_ISSUES
                ));
            }
        }
    }

    out.push_str(&format!("{}\n", "=".repeat(50)));
    let verdict = if summary.overall_passed {
        "All validations passed"
    } else {
        "Validation failed"
    };
    out.push_str(&format!("{} ({}ms)\n", verdict, summary.duration_ms));
    out
}

pub fn render_json(summary: &ValidationSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

pub fn render_markdown(summary: &ValidationSummary) -> String {
    let mut report = String::new();

    report.push_str("# Validation Report\n\n");
    report.push_str(&format!(
        "**Verdict**: {}\n",
        if summary.overall_passed { "PASS" } else { "FAIL" }
    ));
    report.push_str(&format!(
        "**Generated**: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report.push_str(&format!("**Duration**: {}ms\n\n", summary.duration_ms));

    report.push_str("## Categories\n\n");
    report.push_str("| Category | Status | Issues |\n");
    report.push_str("|----------|--------|--------|\n");
    for result in &summary.results {
        report.push_str(&format!(
            "| {} | {} | {} |\n",
            result.category,
            if result.passed() { "PASS" } else { "FAIL" },
            result.outcome.issues().len()
        ));
    }
    report.push('\n');

    let failed: Vec<_> = summary.failed().collect();
    if !failed.is_empty() {
        report.push_str("## Issues\n\n");
        for result in failed {
            report.push_str(&format!("### {}\n\n", result.category));
            for issue in result.outcome.issues() {
                report.push_str(&format!("- {}\n", issue));
            }
            report.push('\n');
        }
    }

    report
}
