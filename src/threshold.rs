//! Threshold configuration and evaluation of coverage summaries against it.
//!
//! A threshold value is interpreted in one of two modes:
//!
//!   - **percentage** (value `>= 0`): at least that percent of units must be
//!     covered, compared against the percentage rounded to 2 decimals;
//!   - **unit** (value `< 0`): at most `-value` units may be uncovered.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CovgateError, Result};
use crate::group::{grouped_coverage_summary, GroupSummary, MergedKind};
use crate::matcher::PathMatcher;
use crate::model::{FileSummary, Metric};

/// Reserved group name collecting every file no other group matched.
pub const GLOBAL_GROUP: &str = "global";

/// Per-metric threshold values for one group. Unset metrics are not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statements: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<f64>,
}

impl MetricThresholds {
    #[must_use]
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Statements => self.statements,
            Metric::Branches => self.branches,
            Metric::Functions => self.functions,
            Metric::Lines => self.lines,
        }
    }
}

/// Group specifier → thresholds, in configuration order. Order matters:
/// groups are classified and reported in this order.
pub type Thresholds = IndexMap<String, MetricThresholds>;

/// Reject thresholds that can never be meaningfully evaluated.
pub fn validate(thresholds: &Thresholds) -> Result<()> {
    if thresholds.is_empty() {
        return Err(CovgateError::Config("no threshold groups configured".into()));
    }
    for (group, values) in thresholds {
        for metric in Metric::ALL {
            let Some(value) = values.get(metric) else {
                continue;
            };
            let reason = if !value.is_finite() {
                format!("{metric} threshold must be a finite number")
            } else if value > 100.0 {
                format!("{metric} threshold {value} exceeds 100%")
            } else {
                continue;
            };
            return Err(CovgateError::InvalidThreshold {
                group: group.clone(),
                reason,
            });
        }
    }
    Ok(())
}

/// Outcome of checking one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CheckResult {
    /// `expected` is the configured percentage, `received` the rounded
    /// covered percentage.
    Percentage {
        expected: f64,
        received: f64,
        pass: bool,
    },
    /// `expected` is the minimum number of covered units (`total` plus the
    /// negative threshold), `received` the covered units.
    Unit {
        expected: f64,
        received: u64,
        pass: bool,
    },
    /// No threshold was configured for the metric.
    Unspecified,
    /// There were no units to measure.
    Empty,
}

/// One check result per metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricChecks {
    pub statements: CheckResult,
    pub branches: CheckResult,
    pub functions: CheckResult,
    pub lines: CheckResult,
}

impl MetricChecks {
    #[must_use]
    pub fn get(&self, metric: Metric) -> CheckResult {
        match metric {
            Metric::Statements => self.statements,
            Metric::Branches => self.branches,
            Metric::Functions => self.functions,
            Metric::Lines => self.lines,
        }
    }

    /// Results in `Metric::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, CheckResult)> + '_ {
        Metric::ALL.into_iter().map(|m| (m, self.get(m)))
    }
}

/// Check a single metric of a summary.
#[must_use]
pub fn check_metric(summary: &FileSummary, metric: Metric, threshold: Option<f64>) -> CheckResult {
    let Some(threshold) = threshold else {
        return CheckResult::Unspecified;
    };

    let stat = summary.get(metric);
    if stat.total == 0 {
        return CheckResult::Empty;
    }

    if threshold < 0.0 {
        CheckResult::Unit {
            expected: stat.total as f64 + threshold,
            received: stat.covered,
            pass: stat.uncovered() as f64 <= -threshold,
        }
    } else {
        let received = stat.pct();
        CheckResult::Percentage {
            expected: threshold,
            received,
            pass: received >= threshold,
        }
    }
}

/// Check every metric of a summary against a group's thresholds.
#[must_use]
pub fn check_summary(summary: &FileSummary, thresholds: &MetricThresholds) -> MetricChecks {
    MetricChecks {
        statements: check_metric(summary, Metric::Statements, thresholds.statements),
        branches: check_metric(summary, Metric::Branches, thresholds.branches),
        functions: check_metric(summary, Metric::Functions, thresholds.functions),
        lines: check_metric(summary, Metric::Lines, thresholds.lines),
    }
}

/// Check results of one threshold group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupResult {
    /// No coverage data matched the group.
    Unidentified,
    /// Path or global group, checked on its merged summary.
    Merged {
        kind: MergedKind,
        checks: MetricChecks,
    },
    /// Glob group, checked file by file.
    PerFile {
        checks: IndexMap<String, MetricChecks>,
    },
}

/// Group name → result, in configuration order.
pub type ThresholdReport = IndexMap<String, GroupResult>;

/// Evaluate already aggregated group summaries.
#[must_use]
pub fn check_grouped(
    grouped: &IndexMap<String, GroupSummary>,
    thresholds: &Thresholds,
) -> ThresholdReport {
    grouped
        .iter()
        .map(|(group, summary)| {
            let values = thresholds.get(group).copied().unwrap_or_default();
            let result = match summary {
                GroupSummary::Unidentified => GroupResult::Unidentified,
                GroupSummary::Merged { kind, summary } => GroupResult::Merged {
                    kind: *kind,
                    checks: check_summary(summary, &values),
                },
                GroupSummary::PerFile { summary } => GroupResult::PerFile {
                    checks: summary
                        .iter()
                        .map(|(file, s)| (file.clone(), check_summary(s, &values)))
                        .collect(),
                },
            };
            (group.clone(), result)
        })
        .collect()
}

/// Classify per-file summaries into the configured groups and check each
/// group against its thresholds.
pub fn check_thresholds<M: PathMatcher + ?Sized>(
    summaries: &BTreeMap<String, FileSummary>,
    thresholds: &Thresholds,
    root: &Path,
    matcher: &M,
) -> Result<ThresholdReport> {
    let grouped = grouped_coverage_summary(summaries, thresholds, root, matcher)?;
    Ok(check_grouped(&grouped, thresholds))
}
