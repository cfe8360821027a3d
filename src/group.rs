//! Partitions per-file coverage into threshold groups and aggregates each
//! group's coverage.
//!
//! Every configured group specifier is resolved to an absolute form and
//! tested against every covered file in two ways:
//!
//!   1. as a path prefix (a plain string prefix, so `src/a` also claims
//!      `src/ab.js`; a trailing separator restricts it to a directory), and
//!   2. as a glob pattern, evaluated through a [`PathMatcher`].
//!
//! Both tests run for every specifier and a file may land in any number of
//! groups. When both tests match, the group is classified as a glob group
//! because the glob test is evaluated last. Files that no specifier claims
//! fall into the reserved `global` group, if one is configured.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::matcher::{GlobCache, PathMatcher};
use crate::model::FileSummary;
use crate::threshold::{Thresholds, GLOBAL_GROUP};

/// How a threshold group was resolved against the current coverage
/// snapshot. This decides which check algorithm applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Matched by path prefix: all files are merged into one summary.
    Path,
    /// Matched as a glob: every file is checked on its own.
    Glob,
    /// Catch-all for files no other group claimed; merged like `Path`.
    Global,
    /// No file matched the group.
    Unidentified,
}

/// The group kinds whose files are merged into one summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergedKind {
    Path,
    Global,
}

/// Aggregated coverage of one threshold group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupSummary {
    Unidentified,
    Merged {
        kind: MergedKind,
        summary: FileSummary,
    },
    PerFile {
        summary: IndexMap<String, FileSummary>,
    },
}

/// Resolve a group specifier against `root`, keeping a trailing separator
/// if the specifier had one.
#[must_use]
pub fn absolute_specifier(specifier: &str, root: &Path) -> String {
    let mut resolved = normalize(&root.join(specifier))
        .to_string_lossy()
        .into_owned();

    if has_trailing_separator(specifier) && !resolved.ends_with(MAIN_SEPARATOR) {
        resolved.push(MAIN_SEPARATOR);
    }
    resolved
}

fn has_trailing_separator(specifier: &str) -> bool {
    specifier.ends_with(MAIN_SEPARATOR) || (cfg!(windows) && specifier.ends_with('/'))
}

/// Lexically collapse `.` and `..` components without touching the
/// filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Files attached to each group, and the type each group resolved to.
#[derive(Debug, Default)]
pub struct Classification {
    /// Every configured group, in configuration order.
    pub files_by_group: IndexMap<String, Vec<String>>,
    group_types: HashMap<String, GroupType>,
}

impl Classification {
    #[must_use]
    pub fn group_type(&self, group: &str) -> GroupType {
        self.group_types
            .get(group)
            .copied()
            .unwrap_or(GroupType::Unidentified)
    }

    #[must_use]
    pub fn files(&self, group: &str) -> &[String] {
        self.files_by_group
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn attach(&mut self, group: &str, file: &str, group_type: GroupType) {
        if let Some(files) = self.files_by_group.get_mut(group) {
            files.push(file.to_string());
        }
        self.group_types.insert(group.to_string(), group_type);
    }
}

/// Assign each covered file to the group(s) it matches.
///
/// Glob results are memoized per pattern for the duration of this call only.
pub fn classify<M: PathMatcher + ?Sized>(
    files: &[String],
    thresholds: &Thresholds,
    root: &Path,
    matcher: &M,
) -> Result<Classification> {
    let mut classification = Classification {
        files_by_group: thresholds
            .keys()
            .map(|group| (group.clone(), Vec::new()))
            .collect(),
        group_types: HashMap::new(),
    };

    let has_global = thresholds.contains_key(GLOBAL_GROUP);
    let groups: Vec<(&str, String)> = thresholds
        .keys()
        .filter(|group| group.as_str() != GLOBAL_GROUP)
        .map(|group| (group.as_str(), absolute_specifier(group, root)))
        .collect();

    let mut glob = GlobCache::new(matcher, files);

    for file in files {
        let mut fell_into_group = false;

        for (group, absolute) in &groups {
            let mut attached = false;

            if file.starts_with(absolute.as_str()) {
                classification.attach(group, file, GroupType::Path);
                attached = true;
            }

            if glob.is_match(absolute, file)? {
                if attached {
                    classification
                        .group_types
                        .insert(group.to_string(), GroupType::Glob);
                } else {
                    classification.attach(group, file, GroupType::Glob);
                    attached = true;
                }
            }

            fell_into_group |= attached;
        }

        if !fell_into_group && has_global {
            classification.attach(GLOBAL_GROUP, file, GroupType::Global);
        }
    }

    for (group, matched) in &classification.files_by_group {
        if matched.is_empty() && group != GLOBAL_GROUP {
            warn!(group = %group, "no coverage data matched threshold group");
        }
    }
    info!(
        files = files.len(),
        groups = classification.files_by_group.len(),
        "classified coverage into threshold groups"
    );

    Ok(classification)
}

/// Merge or enumerate the summaries of each classified group.
#[must_use]
pub fn aggregate(
    classification: &Classification,
    summaries: &BTreeMap<String, FileSummary>,
) -> IndexMap<String, GroupSummary> {
    classification
        .files_by_group
        .iter()
        .map(|(group, files)| {
            let summary_of = |file: &String| summaries.get(file).copied().unwrap_or_default();

            let summary = match classification.group_type(group) {
                GroupType::Unidentified => GroupSummary::Unidentified,
                GroupType::Glob => GroupSummary::PerFile {
                    summary: files.iter().map(|f| (f.clone(), summary_of(f))).collect(),
                },
                GroupType::Path => GroupSummary::Merged {
                    kind: MergedKind::Path,
                    summary: files.iter().map(summary_of).sum(),
                },
                GroupType::Global => GroupSummary::Merged {
                    kind: MergedKind::Global,
                    summary: files.iter().map(summary_of).sum(),
                },
            };
            (group.clone(), summary)
        })
        .collect()
}

/// Classify the files of `summaries` and aggregate every configured group.
pub fn grouped_coverage_summary<M: PathMatcher + ?Sized>(
    summaries: &BTreeMap<String, FileSummary>,
    thresholds: &Thresholds,
    root: &Path,
    matcher: &M,
) -> Result<IndexMap<String, GroupSummary>> {
    let files: Vec<String> = summaries.keys().cloned().collect();
    let classification = classify(&files, thresholds, root, matcher)?;
    Ok(aggregate(&classification, summaries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::GlobsetMatcher;
    use crate::model::CoverageStat;
    use crate::threshold::MetricThresholds;

    const ROOT: &str = "/project";

    fn thresholds(groups: &[&str]) -> Thresholds {
        groups
            .iter()
            .map(|g| (g.to_string(), MetricThresholds::default()))
            .collect()
    }

    fn files(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn run(files: &[String], groups: &[&str]) -> Classification {
        classify(files, &thresholds(groups), Path::new(ROOT), &GlobsetMatcher).unwrap()
    }

    #[test]
    fn test_absolute_specifier() {
        let root = Path::new(ROOT);
        assert_eq!(absolute_specifier("./src/", root), "/project/src/");
        assert_eq!(absolute_specifier("src", root), "/project/src");
        assert_eq!(absolute_specifier("./src/../lib/a.js", root), "/project/lib/a.js");
        assert_eq!(absolute_specifier("/abs/dir/", root), "/abs/dir/");
        assert_eq!(absolute_specifier("src/**/*.js", root), "/project/src/**/*.js");
    }

    #[test]
    fn test_directory_specifier_is_path_group() {
        let f = files(&["/project/dir/a.js", "/project/dir/b.js", "/project/other.js"]);
        let c = run(&f, &["./dir/"]);
        assert_eq!(c.group_type("./dir/"), GroupType::Path);
        assert_eq!(c.files("./dir/"), &f[..2]);
    }

    #[test]
    fn test_prefix_without_separator_matches_siblings() {
        let f = files(&["/project/src/a.js", "/project/srcgen/b.js"]);
        let c = run(&f, &["./src"]);
        assert_eq!(c.group_type("./src"), GroupType::Path);
        assert_eq!(c.files("./src").len(), 2);
    }

    #[test]
    fn test_glob_specifier_is_glob_group() {
        let f = files(&["/project/src/a.js", "/project/src/b.ts"]);
        let c = run(&f, &["./src/*.js"]);
        assert_eq!(c.group_type("./src/*.js"), GroupType::Glob);
        assert_eq!(c.files("./src/*.js"), &f[..1]);
    }

    #[test]
    fn test_prefix_and_glob_match_resolves_to_glob_once() {
        // An exact file path matches both as prefix and as a literal glob.
        let f = files(&["/project/src/a.js"]);
        let c = run(&f, &["./src/a.js"]);
        assert_eq!(c.group_type("./src/a.js"), GroupType::Glob);
        assert_eq!(c.files("./src/a.js"), &f[..]);
    }

    #[test]
    fn test_overlapping_groups_each_get_the_file() {
        let f = files(&["/project/src/a.js"]);
        let c = run(&f, &["./src/", "./src/*.js"]);
        assert_eq!(c.files("./src/"), &f[..]);
        assert_eq!(c.files("./src/*.js"), &f[..]);
        assert_eq!(c.group_type("./src/"), GroupType::Path);
        assert_eq!(c.group_type("./src/*.js"), GroupType::Glob);
    }

    #[test]
    fn test_global_collects_unmatched_files() {
        let f = files(&["/project/src/a.js", "/project/lib/b.js"]);
        let c = run(&f, &["./src/", "global"]);
        assert_eq!(c.group_type(GLOBAL_GROUP), GroupType::Global);
        assert_eq!(c.files(GLOBAL_GROUP), &f[1..]);
    }

    #[test]
    fn test_global_is_unidentified_when_everything_is_claimed() {
        let f = files(&["/project/src/a.js"]);
        let c = run(&f, &["global", "./src/"]);
        assert_eq!(c.group_type(GLOBAL_GROUP), GroupType::Unidentified);
        assert!(c.files(GLOBAL_GROUP).is_empty());
    }

    #[test]
    fn test_global_name_is_not_matched_as_a_path() {
        let f = files(&["/project/global/a.js"]);
        let c = run(&f, &["global"]);
        assert_eq!(c.group_type(GLOBAL_GROUP), GroupType::Global);
    }

    #[test]
    fn test_unmatched_files_are_dropped_without_global() {
        let f = files(&["/project/lib/b.js"]);
        let c = run(&f, &["./src/"]);
        assert_eq!(c.group_type("./src/"), GroupType::Unidentified);
        assert_eq!(c.files_by_group.len(), 1);
    }

    #[test]
    fn test_aggregate_merges_path_and_enumerates_glob() {
        let summaries: BTreeMap<String, FileSummary> = ["/project/dir/a.js", "/project/dir/b.js"]
            .iter()
            .map(|p| {
                (
                    p.to_string(),
                    FileSummary {
                        statements: CoverageStat::new(5, 10),
                        ..Default::default()
                    },
                )
            })
            .collect();

        let grouped = grouped_coverage_summary(
            &summaries,
            &thresholds(&["./dir/", "./dir/*.js", "./missing/"]),
            Path::new(ROOT),
            &GlobsetMatcher,
        )
        .unwrap();

        let keys: Vec<_> = grouped.keys().map(String::as_str).collect();
        assert_eq!(keys, ["./dir/", "./dir/*.js", "./missing/"]);

        match &grouped["./dir/"] {
            GroupSummary::Merged { kind, summary } => {
                assert_eq!(*kind, MergedKind::Path);
                assert_eq!(summary.statements, CoverageStat::new(10, 20));
            }
            other => panic!("expected merged summary, got {other:?}"),
        }
        match &grouped["./dir/*.js"] {
            GroupSummary::PerFile { summary } => {
                assert_eq!(summary.len(), 2);
                assert_eq!(summary["/project/dir/a.js"].statements, CoverageStat::new(5, 10));
            }
            other => panic!("expected per-file summary, got {other:?}"),
        }
        assert_eq!(grouped["./missing/"], GroupSummary::Unidentified);
    }
}
