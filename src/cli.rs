//! Command handler functions for the covgate CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::group::{grouped_coverage_summary, GroupSummary};
use crate::matcher::GlobsetMatcher;
use crate::model::{CoverageStat, FileSummary, Metric};
use crate::report::{CheckReport, JsonFormatter, MarkdownFormatter, ReportFormatter, TextFormatter};
use crate::summarize::summarize_coverage_map;
use crate::threshold::check_thresholds;
use crate::{config, istanbul};

/// Output style for the `check` command.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Style {
    Text,
    Markdown,
    Json,
}

/// Rendered output of `check`, plus the verdict that decides the exit code.
pub struct CheckOutcome {
    pub output: String,
    pub passed: bool,
}

pub fn cmd_check(coverage: &Path, thresholds: &Path, root: &Path, style: Style) -> Result<CheckOutcome> {
    let map = istanbul::parse_file(coverage)
        .with_context(|| format!("Failed to read coverage from {}", coverage.display()))?;
    let thresholds = config::load_thresholds(thresholds)
        .with_context(|| format!("Failed to load thresholds from {}", thresholds.display()))?;

    let summaries = summarize_coverage_map(&map);
    let result = check_thresholds(&summaries, &thresholds, root, &GlobsetMatcher)?;
    let report = CheckReport::new(&result)?;

    let formatter: &dyn ReportFormatter = match style {
        Style::Text => &TextFormatter,
        Style::Markdown => &MarkdownFormatter,
        Style::Json => &JsonFormatter,
    };

    Ok(CheckOutcome {
        output: report.format(formatter),
        passed: report.passed,
    })
}

fn stat_cell(stat: CoverageStat) -> String {
    if stat.total == 0 {
        "-".to_string()
    } else {
        format!("{}/{} ({:.1}%)", stat.covered, stat.total, stat.pct())
    }
}

fn summary_row(out: &mut String, name: &str, summary: &FileSummary) {
    write!(out, "{name:<50}").unwrap();
    for metric in Metric::ALL {
        write!(out, " {:>20}", stat_cell(summary.get(metric))).unwrap();
    }
    out.push('\n');
}

fn summary_header(out: &mut String, first: &str) {
    write!(out, "{first:<50}").unwrap();
    for metric in Metric::ALL {
        write!(out, " {:>20}", metric.as_str().to_uppercase()).unwrap();
    }
    out.push('\n');
    writeln!(out, "{}", "-".repeat(50 + 21 * Metric::ALL.len())).unwrap();
}

/// Per-file summary, or per-group summary when thresholds are given.
pub fn cmd_summary(coverage: &Path, thresholds: Option<&Path>, root: &Path) -> Result<String> {
    let map = istanbul::parse_file(coverage)
        .with_context(|| format!("Failed to read coverage from {}", coverage.display()))?;
    let summaries = summarize_coverage_map(&map);

    let mut out = String::new();

    let Some(thresholds) = thresholds else {
        if summaries.is_empty() {
            return Ok("No files in coverage data.\n".to_string());
        }
        summary_header(&mut out, "FILE");
        for (path, summary) in &summaries {
            summary_row(&mut out, path, summary);
        }
        let total: FileSummary = summaries.values().sum();
        summary_row(&mut out, "TOTAL", &total);
        return Ok(out);
    };

    let thresholds = config::load_thresholds(thresholds)
        .with_context(|| format!("Failed to load thresholds from {}", thresholds.display()))?;
    let grouped = grouped_coverage_summary(&summaries, &thresholds, root, &GlobsetMatcher)?;

    summary_header(&mut out, "GROUP");
    for (group, summary) in &grouped {
        match summary {
            GroupSummary::Unidentified => {
                writeln!(out, "{group:<50} (no coverage data)").unwrap();
            }
            GroupSummary::Merged { summary, .. } => summary_row(&mut out, group, summary),
            GroupSummary::PerFile { summary } => {
                writeln!(out, "{group}").unwrap();
                for (file, file_summary) in summary {
                    summary_row(&mut out, &format!("  {file}"), file_summary);
                }
            }
        }
    }
    Ok(out)
}
