//! Glob matching on kubeconfig leaf names.

use globset::{GlobBuilder, GlobMatcher};
use std::fmt;

/// Name filter applied to the leaf segment of every candidate.
///
/// Case-sensitive; `*` and `?` never match a path separator.
#[derive(Clone, Debug)]
pub struct NameFilter {
    pattern: String,
    matcher: GlobMatcher,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self, String> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err("pattern is empty".to_string());
        }
        let matcher = GlobBuilder::new(pattern)
            .case_insensitive(false)
            .literal_separator(true)
            .build()
            .map_err(|e| e.to_string())?
            .compile_matcher();
        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, leaf_name: &str) -> bool {
        self.matcher.is_match(leaf_name)
    }
}

impl PartialEq for NameFilter {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for NameFilter {}

impl fmt::Display for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}
