//! Derives per-file `{total, covered}` counts from raw hit data.

use std::collections::{BTreeMap, HashMap};

use crate::model::{CoverageMap, CoverageStat, FileCoverageData, FileSummary};

/// `total` is the number of entries, `covered` the number with a hit.
fn summarize_hits<'a>(hits: impl Iterator<Item = &'a u64>) -> CoverageStat {
    let (total, covered) = hits.fold((0, 0), |(total, covered), &h| {
        (total + 1, covered + u64::from(h > 0))
    });
    CoverageStat { total, covered }
}

pub fn summarize_statements(coverage: &FileCoverageData) -> CoverageStat {
    summarize_hits(coverage.s.values())
}

/// A function counts as covered once it has been called at least once.
pub fn summarize_functions(coverage: &FileCoverageData) -> CoverageStat {
    summarize_hits(coverage.f.values())
}

/// Every arm of every branch site is a unit.
pub fn summarize_branches(coverage: &FileCoverageData) -> CoverageStat {
    summarize_hits(coverage.b.values().flatten())
}

/// A line is counted for each statement beginning on it, taking the highest
/// hit count of those statements. Statements without a known start line are
/// ignored.
pub fn summarize_lines(coverage: &FileCoverageData) -> CoverageStat {
    let mut line_hits: HashMap<u32, u64> = HashMap::new();

    for (idx, &hits) in &coverage.s {
        let Some(&line) = coverage.statement_map.get(idx) else {
            continue;
        };
        line_hits
            .entry(line)
            .and_modify(|e| *e = (*e).max(hits))
            .or_insert(hits);
    }

    summarize_hits(line_hits.values())
}

pub fn summarize_file(coverage: &FileCoverageData) -> FileSummary {
    FileSummary {
        statements: summarize_statements(coverage),
        branches: summarize_branches(coverage),
        functions: summarize_functions(coverage),
        lines: summarize_lines(coverage),
    }
}

/// Summarize every file of a coverage map, keyed by the map's file names.
pub fn summarize_coverage_map(map: &CoverageMap) -> BTreeMap<String, FileSummary> {
    map.iter()
        .map(|(path, coverage)| (path.clone(), summarize_file(coverage)))
        .collect()
}
