//! Numeric coverage containers shared by the summarizer, the group
//! aggregator and the threshold evaluator.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// One of the four measured kinds of coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Statements,
    Branches,
    Lines,
    Functions,
}

impl Metric {
    /// Every metric, in the order checks are evaluated and reported.
    pub const ALL: [Metric; 4] = [
        Metric::Statements,
        Metric::Branches,
        Metric::Lines,
        Metric::Functions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Statements => "statements",
            Metric::Branches => "branches",
            Metric::Functions => "functions",
            Metric::Lines => "lines",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total and covered unit counts for a single metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageStat {
    pub total: u64,
    pub covered: u64,
}

impl CoverageStat {
    #[must_use]
    pub fn new(covered: u64, total: u64) -> Self {
        debug_assert!(covered <= total, "covered ({covered}) exceeds total ({total})");
        Self { total, covered }
    }

    /// Units left uncovered. Zero when `covered` exceeds `total`, which only
    /// deserialized stats can produce.
    #[must_use]
    pub fn uncovered(&self) -> u64 {
        self.total.saturating_sub(self.covered)
    }

    /// Covered percentage on a 0–100 scale, rounded to 2 decimal places so
    /// that comparisons agree with what is displayed. An empty stat reports
    /// 100%.
    #[must_use]
    pub fn pct(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.covered as f64 * 10_000.0 / self.total as f64).round() / 100.0
    }

    #[must_use]
    pub fn merge(self, other: CoverageStat) -> CoverageStat {
        CoverageStat {
            total: self.total + other.total,
            covered: self.covered + other.covered,
        }
    }
}

impl Add for CoverageStat {
    type Output = CoverageStat;

    fn add(self, rhs: CoverageStat) -> CoverageStat {
        self.merge(rhs)
    }
}

impl AddAssign for CoverageStat {
    fn add_assign(&mut self, rhs: CoverageStat) {
        *self = self.merge(rhs);
    }
}

/// Per-metric coverage of one source file, or of several files merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub statements: CoverageStat,
    pub branches: CoverageStat,
    pub functions: CoverageStat,
    pub lines: CoverageStat,
}

impl FileSummary {
    #[must_use]
    pub fn get(&self, metric: Metric) -> CoverageStat {
        match metric {
            Metric::Statements => self.statements,
            Metric::Branches => self.branches,
            Metric::Functions => self.functions,
            Metric::Lines => self.lines,
        }
    }

    /// Field-wise sum of two summaries.
    #[must_use]
    pub fn merge(&self, other: &FileSummary) -> FileSummary {
        FileSummary {
            statements: self.statements + other.statements,
            branches: self.branches + other.branches,
            functions: self.functions + other.functions,
            lines: self.lines + other.lines,
        }
    }
}

impl std::iter::Sum for FileSummary {
    fn sum<I: Iterator<Item = FileSummary>>(iter: I) -> FileSummary {
        iter.fold(FileSummary::default(), |acc, s| acc.merge(&s))
    }
}

impl<'a> std::iter::Sum<&'a FileSummary> for FileSummary {
    fn sum<I: Iterator<Item = &'a FileSummary>>(iter: I) -> FileSummary {
        iter.fold(FileSummary::default(), |acc, s| acc.merge(s))
    }
}

/// Raw instrumentation data for a single source file, as produced by an
/// external coverage collector. Keys are the collector's internal indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCoverageData {
    pub path: String,
    /// Statement index → source line the statement starts on.
    pub statement_map: BTreeMap<String, u32>,
    /// Statement index → hit count.
    pub s: BTreeMap<String, u64>,
    /// Function index → hit count.
    pub f: BTreeMap<String, u64>,
    /// Branch site index → hit count per arm.
    pub b: BTreeMap<String, Vec<u64>>,
}

impl FileCoverageData {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}

/// Raw coverage of a whole project, keyed by file path.
pub type CoverageMap = BTreeMap<String, FileCoverageData>;
