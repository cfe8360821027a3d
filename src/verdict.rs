//! Flattening of threshold reports and the overall pass/fail verdict.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CovgateError, Result};
use crate::model::Metric;
use crate::threshold::{CheckResult, GroupResult, MetricChecks, ThresholdReport, GLOBAL_GROUP};

/// One row of a flattened report.
///
/// `group` is the group name, or the file path for glob groups. A record
/// without a metric stands for a whole group that had no coverage data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatCheck {
    pub group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    #[serde(flatten)]
    pub result: FlatResult,
}

/// A known check result, or a record with a type this crate does not
/// recognize (only reachable through deserialized input). Records without
/// any `type` land here too and are judged like `Empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlatResult {
    Check(CheckResult),
    Unrecognized(Map<String, Value>),
}

impl FlatCheck {
    #[must_use]
    pub fn new(group: impl Into<String>, metric: Option<Metric>, result: CheckResult) -> Self {
        Self {
            group: group.into(),
            metric,
            result: FlatResult::Check(result),
        }
    }
}

fn push_checks(out: &mut Vec<FlatCheck>, group: &str, checks: &MetricChecks) {
    out.extend(
        checks
            .iter()
            .map(|(metric, result)| FlatCheck::new(group, Some(metric), result)),
    );
}

/// Convert a nested report into a flat list, preserving group, file and
/// metric order.
#[must_use]
pub fn flatten(report: &ThresholdReport) -> Vec<FlatCheck> {
    let mut out = Vec::new();

    for (group, result) in report {
        match result {
            GroupResult::Unidentified => {
                out.push(FlatCheck::new(group.as_str(), None, CheckResult::Empty));
            }
            GroupResult::Merged { checks, .. } => push_checks(&mut out, group, checks),
            GroupResult::PerFile { checks } => {
                for (file, file_checks) in checks {
                    push_checks(&mut out, file, file_checks);
                }
            }
        }
    }

    out
}

#[must_use]
pub fn is_specified_check(check: &FlatCheck) -> bool {
    !matches!(check.result, FlatResult::Check(CheckResult::Unspecified))
}

/// Whether a record counts as a failure.
///
/// A missing-data record fails for every group except `global`: an empty
/// catch-all only means more specific groups claimed every file.
pub fn is_failed_check(check: &FlatCheck) -> Result<bool> {
    match &check.result {
        FlatResult::Check(CheckResult::Unspecified) => Ok(false),
        FlatResult::Check(CheckResult::Empty) => Ok(check.group != GLOBAL_GROUP),
        FlatResult::Check(CheckResult::Percentage { pass, .. })
        | FlatResult::Check(CheckResult::Unit { pass, .. }) => Ok(!pass),
        FlatResult::Unrecognized(fields) => match fields.get("type") {
            // A bare `{ "group": .. }` record is a group with no coverage data.
            None => Ok(check.group != GLOBAL_GROUP),
            Some(tag) => Err(CovgateError::UnrecognizedCheck(
                tag.as_str().map_or_else(|| tag.to_string(), str::to_string),
            )),
        },
    }
}

pub fn is_succeeded_check(check: &FlatCheck) -> Result<bool> {
    Ok(is_specified_check(check) && !is_failed_check(check)?)
}

/// Input accepted by [`is_passed`]: a nested report or its flattened form.
#[derive(Debug, Clone, Copy)]
pub enum Checks<'a> {
    Report(&'a ThresholdReport),
    Flat(&'a [FlatCheck]),
}

impl<'a> From<&'a ThresholdReport> for Checks<'a> {
    fn from(report: &'a ThresholdReport) -> Self {
        Checks::Report(report)
    }
}

impl<'a> From<&'a [FlatCheck]> for Checks<'a> {
    fn from(flat: &'a [FlatCheck]) -> Self {
        Checks::Flat(flat)
    }
}

impl<'a> From<&'a Vec<FlatCheck>> for Checks<'a> {
    fn from(flat: &'a Vec<FlatCheck>) -> Self {
        Checks::Flat(flat)
    }
}

/// `true` iff no record is a failed check.
///
/// Returns an error when a record has an unrecognized type; that signals an
/// internal inconsistency rather than a coverage failure.
pub fn is_passed<'a>(checks: impl Into<Checks<'a>>) -> Result<bool> {
    let owned;
    let flat = match checks.into() {
        Checks::Flat(flat) => flat,
        Checks::Report(report) => {
            owned = flatten(report);
            owned.as_slice()
        }
    };

    for check in flat {
        if is_failed_check(check)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Records that failed, in report order.
pub fn failed_checks(flat: &[FlatCheck]) -> Result<Vec<&FlatCheck>> {
    let mut failed = Vec::new();
    for check in flat {
        if is_failed_check(check)? {
            failed.push(check);
        }
    }
    Ok(failed)
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::group::MergedKind;

    fn percentage(pass: bool) -> CheckResult {
        CheckResult::Percentage {
            expected: 50.0,
            received: if pass { 60.0 } else { 40.0 },
            pass,
        }
    }

    fn checks(statements: CheckResult) -> MetricChecks {
        MetricChecks {
            statements,
            branches: CheckResult::Unspecified,
            functions: CheckResult::Unspecified,
            lines: CheckResult::Unspecified,
        }
    }

    #[test]
    fn test_unspecified_is_never_failed_or_succeeded() {
        let check = FlatCheck::new("hello", Some(Metric::Branches), CheckResult::Unspecified);
        assert!(!is_failed_check(&check).unwrap());
        assert!(!is_succeeded_check(&check).unwrap());
        assert!(!is_specified_check(&check));
    }

    #[test]
    fn test_empty_global_is_benign() {
        let check = FlatCheck::new(GLOBAL_GROUP, None, CheckResult::Empty);
        assert!(!is_failed_check(&check).unwrap());
        assert!(is_succeeded_check(&check).unwrap());
    }

    #[test]
    fn test_empty_other_group_fails() {
        let check = FlatCheck::new("./src/", None, CheckResult::Empty);
        assert!(is_failed_check(&check).unwrap());
        assert!(!is_succeeded_check(&check).unwrap());
    }

    #[test]
    fn test_pass_attribute_decides_percentage_and_unit() {
        assert!(!is_failed_check(&FlatCheck::new("a", None, percentage(true))).unwrap());
        assert!(is_failed_check(&FlatCheck::new("a", None, percentage(false))).unwrap());

        let unit = |pass| CheckResult::Unit {
            expected: 7.0,
            received: 5,
            pass,
        };
        assert!(!is_failed_check(&FlatCheck::new("1", None, unit(true))).unwrap());
        assert!(is_failed_check(&FlatCheck::new("2", None, unit(false))).unwrap());
    }

    #[test]
    fn test_unrecognized_type_is_an_error() {
        let flat: Vec<FlatCheck> =
            serde_json::from_str(r#"[{ "group": "a", "metric": "lines", "type": "asdf" }]"#)
                .unwrap();
        assert!(matches!(flat[0].result, FlatResult::Unrecognized(_)));

        let err = is_passed(&flat).unwrap_err();
        assert!(matches!(err, CovgateError::UnrecognizedCheck(ref t) if t == "asdf"));
    }

    #[test]
    fn test_untyped_record_counts_as_empty() {
        let flat: Vec<FlatCheck> =
            serde_json::from_str(r#"[{ "group": "global" }, { "group": "./src/" }]"#).unwrap();
        assert!(matches!(flat[0].result, FlatResult::Unrecognized(ref f) if f.is_empty()));

        assert!(!is_failed_check(&flat[0]).unwrap());
        assert!(is_failed_check(&flat[1]).unwrap());
        assert!(is_passed(&flat[..1]).unwrap());
        assert!(!is_passed(&flat).unwrap());
    }

    #[test]
    fn test_flatten_preserves_order_and_names_glob_rows_by_file() {
        let mut per_file = IndexMap::new();
        per_file.insert("/p/src/b.js".to_string(), checks(percentage(true)));
        per_file.insert("/p/src/a.js".to_string(), checks(percentage(false)));

        let mut report = ThresholdReport::new();
        report.insert(
            GLOBAL_GROUP.to_string(),
            GroupResult::Merged {
                kind: MergedKind::Global,
                checks: checks(percentage(true)),
            },
        );
        report.insert("./src/*.js".to_string(), GroupResult::PerFile { checks: per_file });
        report.insert("./missing/".to_string(), GroupResult::Unidentified);

        let flat = flatten(&report);
        assert_eq!(flat.len(), 4 + 8 + 1);

        assert_eq!(flat[0].group, GLOBAL_GROUP);
        assert_eq!(flat[0].metric, Some(Metric::Statements));
        assert_eq!(flat[1].metric, Some(Metric::Branches));
        assert_eq!(flat[4].group, "/p/src/b.js");
        assert_eq!(flat[8].group, "/p/src/a.js");
        assert_eq!(flat[12], FlatCheck::new("./missing/", None, CheckResult::Empty));

        assert!(!is_passed(&report).unwrap());
        assert_eq!(failed_checks(&flat).unwrap().len(), 2);
    }

    #[test]
    fn test_is_passed_accepts_both_shapes() {
        let mut report = ThresholdReport::new();
        report.insert(
            "./src/".to_string(),
            GroupResult::Merged {
                kind: MergedKind::Path,
                checks: checks(percentage(true)),
            },
        );
        report.insert(GLOBAL_GROUP.to_string(), GroupResult::Unidentified);

        assert!(is_passed(&report).unwrap());
        let flat = flatten(&report);
        assert!(is_passed(flat.as_slice()).unwrap());
    }

    #[test]
    fn test_flat_check_round_trips_through_json() {
        let check = FlatCheck::new("./src/", Some(Metric::Lines), percentage(false));
        let json = serde_json::to_string(&check).unwrap();
        assert!(json.contains(r#""type":"percentage""#));
        let back: FlatCheck = serde_json::from_str(&json).unwrap();
        assert_eq!(back, check);
    }
}
