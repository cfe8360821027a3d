//! Output formatting for threshold check results.

use std::fmt::Write;

use crate::error::Result;
use crate::threshold::{CheckResult, ThresholdReport, GLOBAL_GROUP};
use crate::verdict::{flatten, is_failed_check, is_specified_check, FlatCheck, FlatResult};

/// Flattened check results plus the verdict, ready to be formatted.
pub struct CheckReport {
    /// Specified checks only, in report order.
    pub checks: Vec<FlatCheck>,
    /// Number of failed checks.
    pub failed: usize,
    pub passed: bool,
}

impl CheckReport {
    /// Flatten a threshold report, drop unspecified checks and compute the
    /// verdict.
    pub fn new(report: &ThresholdReport) -> Result<Self> {
        let checks: Vec<FlatCheck> = flatten(report)
            .into_iter()
            .filter(is_specified_check)
            .collect();

        let mut failed = 0;
        for check in &checks {
            if is_failed_check(check)? {
                failed += 1;
            }
        }

        Ok(Self {
            checks,
            failed,
            passed: failed == 0,
        })
    }

    /// Format using a specific formatter.
    #[must_use]
    pub fn format(&self, formatter: &dyn ReportFormatter) -> String {
        formatter.format(self)
    }
}

/// Trait for formatting check reports.
pub trait ReportFormatter {
    /// Format the report to a string.
    fn format(&self, report: &CheckReport) -> String;
}

fn target(check: &FlatCheck) -> String {
    match check.metric {
        Some(metric) => format!("{} {metric}", check.group),
        None => check.group.clone(),
    }
}

/// Human readable description of a single check outcome.
fn describe(check: &FlatCheck) -> String {
    match &check.result {
        FlatResult::Check(CheckResult::Percentage {
            expected, received, ..
        }) => format!("{received:.2}% covered, expected at least {expected:.2}%"),
        FlatResult::Check(CheckResult::Unit {
            expected, received, ..
        }) => format!("{received} units covered, expected at least {expected}"),
        FlatResult::Check(CheckResult::Empty) if check.group == GLOBAL_GROUP => {
            "no unmatched files left for the global group".to_string()
        }
        FlatResult::Check(CheckResult::Empty) => "no coverage data".to_string(),
        FlatResult::Check(CheckResult::Unspecified) => "not checked".to_string(),
        FlatResult::Unrecognized(fields) if !fields.contains_key("type") => "no coverage data".to_string(),
        FlatResult::Unrecognized(_) => "unrecognized check".to_string(),
    }
}

fn marker(check: &FlatCheck) -> &'static str {
    match is_failed_check(check) {
        Ok(false) => "✓",
        _ => "✗",
    }
}

fn verdict_line(report: &CheckReport) -> String {
    let total = report.checks.len();
    let noun = if total == 1 { "check" } else { "checks" };
    if report.passed {
        format!("Coverage thresholds passed ({total} {noun})")
    } else {
        let failed = report.failed;
        format!("Coverage thresholds failed ({failed} of {total} {noun})")
    }
}

/// Plain text formatter.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &CheckReport) -> String {
        let mut out = String::new();

        for check in &report.checks {
            let marker = marker(check);
            let target = target(check);
            let detail = describe(check);
            writeln!(out, "{marker} {target}: {detail}").unwrap();
        }

        if !report.checks.is_empty() {
            out.push('\n');
        }
        writeln!(out, "{}", verdict_line(report)).unwrap();
        out
    }
}

/// Markdown formatter.
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &CheckReport) -> String {
        let mut md = String::new();

        let status = if report.passed { "✅" } else { "❌" };
        writeln!(md, "### {status} {}\n", verdict_line(report)).unwrap();

        if report.checks.is_empty() {
            return md;
        }

        md.push_str("| | Group | Metric | Result |\n");
        md.push_str("|:-:|:------|:-------|:-------|\n");
        for check in &report.checks {
            let marker = marker(check);
            let group = &check.group;
            let metric = check.metric.map(|m| m.as_str()).unwrap_or("–");
            let detail = describe(check);
            writeln!(md, "| {marker} | `{group}` | {metric} | {detail} |").unwrap();
        }

        md
    }
}

/// JSON formatter: the flat checks and the verdict.
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &CheckReport) -> String {
        let value = serde_json::json!({
            "passed": report.passed,
            "failed": report.failed,
            "checks": report.checks,
        });
        // Serializing a `Value` built from derived impls cannot fail.
        let mut out = serde_json::to_string_pretty(&value).unwrap_or_default();
        out.push('\n');
        out
    }
}
