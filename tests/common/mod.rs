#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use covgate::model::{CoverageStat, FileSummary};
use covgate::threshold::{MetricThresholds, Thresholds};

pub const ROOT: &str = "/project";

pub fn root() -> &'static Path {
    Path::new(ROOT)
}

pub fn statements(covered: u64, total: u64) -> FileSummary {
    FileSummary {
        statements: CoverageStat::new(covered, total),
        ..Default::default()
    }
}

/// A project snapshot where every file has only statement coverage.
///
/// Files default to 5/10 covered statements.
pub fn project() -> BTreeMap<String, FileSummary> {
    [
        ("path-test/100pc_coverage_file.js", statements(10, 10)),
        ("path-test-files/covered_file_without_threshold.js", statements(5, 10)),
        ("path-test-files/full_path_file.js", statements(5, 10)),
        ("path-test-files/relative_path_file.js", statements(5, 10)),
        ("path-test-files/glob-path/file1.js", statements(5, 10)),
        ("path-test-files/glob-path/file2.js", statements(5, 10)),
        ("path-test-files/000pc_coverage_file.js", statements(0, 10)),
        ("path-test-files/050pc_coverage_file.js", statements(5, 10)),
        ("path-test-files/100pc_coverage_file.js", statements(10, 10)),
    ]
    .into_iter()
    .map(|(path, summary)| (format!("{ROOT}/{path}"), summary))
    .collect()
}

pub fn statement_thresholds(groups: &[(&str, f64)]) -> Thresholds {
    groups
        .iter()
        .map(|(group, value)| {
            (
                group.to_string(),
                MetricThresholds {
                    statements: Some(*value),
                    ..Default::default()
                },
            )
        })
        .collect()
}
