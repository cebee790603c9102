//! Filter state and search matching

use log::debug;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Which fields a search term is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchScope {
    pub tag_names: bool,
    pub text: bool,
    pub attributes: bool,
}

impl Default for SearchScope {
    fn default() -> Self {
        SearchScope {
            tag_names: true,
            text: true,
            attributes: true,
        }
    }
}

/// Every user-controlled filter input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub search: String,
    /// Treat `search` as a regular expression
    pub regex: bool,
    pub scope: SearchScope,
    /// Show only elements with this tag name
    pub element: Option<String>,
    pub include_empty: bool,
    /// Display toggle for attribute rendering, no effect on visibility
    pub show_attributes: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            search: String::new(),
            regex: false,
            scope: SearchScope::default(),
            element: None,
            include_empty: true,
            show_attributes: true,
        }
    }
}

/// Visible and total line counts after a filter pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub total: usize,
    pub visible: usize,
}

/// Case-insensitive matcher for a search term
#[derive(Debug, Clone)]
pub struct SearchMatcher {
    regex: Option<Regex>,
}

impl SearchMatcher {
    /// An empty term builds an inactive matcher. In regex mode an invalid
    /// pattern falls back to the literal term.
    pub fn new(term: &str, regex_mode: bool) -> Self {
        if term.is_empty() {
            return SearchMatcher { regex: None };
        }

        let regex = if regex_mode {
            match build(term) {
                Ok(re) => Some(re),
                Err(e) => {
                    debug!("invalid search pattern {:?}, matching literally: {}", term, e);
                    build(&regex::escape(term)).ok()
                }
            }
        } else {
            build(&regex::escape(term)).ok()
        };

        SearchMatcher { regex }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.regex.is_some()
    }

    /// Whether the pattern matches anywhere in `text`, empty matches included
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Non-empty match spans in `text`
    pub fn find_spans(&self, text: &str) -> Vec<Range<usize>> {
        match &self.regex {
            Some(re) => re
                .find_iter(text)
                .filter(|m| !m.is_empty())
                .map(|m| m.range())
                .collect(),
            None => Vec::new(),
        }
    }
}

fn build(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = FilterState::default();
        assert!(state.include_empty);
        assert!(state.show_attributes);
        assert!(state.scope.tag_names && state.scope.text && state.scope.attributes);
        let parsed: FilterState = serde_json::from_str(r#"{"search":"x"}"#).unwrap();
        assert_eq!(parsed.search, "x");
        assert!(parsed.include_empty);
    }

    #[test]
    fn test_literal_is_case_insensitive() {
        let m = SearchMatcher::new("a.b", false);
        assert_eq!(m.find_spans("A.B axb a.b"), vec![0..3, 8..11]);
    }

    #[test]
    fn test_empty_matches_count_without_spans() {
        let m = SearchMatcher::new("z?", true);
        assert!(m.is_match("abc"));
        assert!(m.find_spans("abc").is_empty());
        assert!(!SearchMatcher::new("", true).is_match("abc"));
    }

    #[test]
    fn test_regex_mode() {
        let m = SearchMatcher::new("b[0-9]+", true);
        assert_eq!(m.find_spans("B12 b x b3"), vec![0..3, 8..10]);
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let m = SearchMatcher::new("a(b", true);
        assert!(m.is_active());
        assert_eq!(m.find_spans("xa(b"), vec![1..4]);
    }

    #[test]
    fn test_empty_spans_skipped() {
        let m = SearchMatcher::new("x*", true);
        assert_eq!(m.find_spans("abxx"), vec![2..4]);
        assert!(!SearchMatcher::new("", true).is_active());
    }
}
