//! Path/glob matching capability used by the group classifier.

use std::collections::{HashMap, HashSet};

use globset::{Glob, GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::error::Result;

/// Given a pattern and a candidate path set, return the matching paths.
///
/// Implementations must be a pure function of their inputs: the result may
/// not depend on candidate order or on previous calls.
pub trait PathMatcher {
    fn match_paths(&self, pattern: &str, candidates: &[String]) -> Result<Vec<String>>;
}

/// In-memory glob matcher backed by `globset`.
///
/// `*` and `?` never cross a `/`; `**` does. Backslashes in the pattern are
/// treated as path separators so Windows-style specifiers behave the same.
/// Wildcards do not match dot-prefixed names: a path with a hidden component
/// only matches when the pattern names that component with a leading dot.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobsetMatcher;

impl PathMatcher for GlobsetMatcher {
    fn match_paths(&self, pattern: &str, candidates: &[String]) -> Result<Vec<String>> {
        let normalized = pattern.replace('\\', "/");
        let glob = match GlobBuilder::new(&normalized).literal_separator(true).build() {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                debug!(pattern, error = %e, "specifier is not a valid glob, matching nothing");
                return Ok(Vec::new());
            }
        };

        let dot_segments = dot_segments(&normalized);

        Ok(candidates
            .iter()
            .filter(|c| {
                let path = c.replace('\\', "/");
                glob.is_match(&path) && hidden_components_allowed(&path, &dot_segments)
            })
            .cloned()
            .collect())
    }
}

fn is_hidden(component: &str) -> bool {
    component.starts_with('.') && component != "." && component != ".."
}

/// Pattern components that start with a dot, compiled on their own.
fn dot_segments(pattern: &str) -> Vec<GlobMatcher> {
    pattern
        .split('/')
        .filter(|segment| is_hidden(segment))
        .filter_map(|segment| Glob::new(segment).ok())
        .map(|glob| glob.compile_matcher())
        .collect()
}

fn hidden_components_allowed(path: &str, dot_segments: &[GlobMatcher]) -> bool {
    path.split('/')
        .filter(|component| is_hidden(component))
        .all(|component| dot_segments.iter().any(|m| m.is_match(component)))
}

/// Memoizes a matcher per distinct pattern string.
///
/// Scoped to a single classification run: the candidate set is fixed at
/// construction, so a cache must never outlive the snapshot it was built for.
pub struct GlobCache<'a, M: PathMatcher + ?Sized> {
    matcher: &'a M,
    candidates: &'a [String],
    store: HashMap<String, HashSet<String>>,
}

impl<'a, M: PathMatcher + ?Sized> GlobCache<'a, M> {
    pub fn new(matcher: &'a M, candidates: &'a [String]) -> Self {
        Self {
            matcher,
            candidates,
            store: HashMap::new(),
        }
    }

    /// Paths matched by `pattern`, invoking the matcher only on first use.
    pub fn matches(&mut self, pattern: &str) -> Result<&HashSet<String>> {
        if !self.store.contains_key(pattern) {
            let matched = self.matcher.match_paths(pattern, self.candidates)?;
            debug!(pattern, matched = matched.len(), "evaluated glob");
            self.store
                .insert(pattern.to_string(), matched.into_iter().collect());
        }
        // Inserted above when missing.
        Ok(&self.store[pattern])
    }

    /// Whether `path` is among the paths matched by `pattern`.
    pub fn is_match(&mut self, pattern: &str, path: &str) -> Result<bool> {
        Ok(self.matches(pattern)?.contains(path))
    }
}
