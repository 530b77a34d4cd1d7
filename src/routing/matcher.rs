//! Dynamic segment matching.
//!
//! # Responsibilities
//! - Match a dynamic segment against the start of the remaining path
//! - Return the matched text, which becomes a capture
//! - Expose a source string that identifies equivalent matchers
//!
//! # Design Decisions
//! - Matching is always prefix-anchored, never whole-path
//! - `:name` and `*name` segments use plain string scanning
//! - Only explicit `(regex)` segments pay for the regex engine
//! - Two matchers are the same tree vertex iff their sources are equal

use regex::Regex;
use std::fmt;

use crate::error::{Error, Result};

/// Anchored prefix matcher for a dynamic tree node.
pub trait PrefixMatcher: Send + Sync + fmt::Debug {
    /// Textual form of the pattern, used to merge equal dynamic nodes.
    fn source(&self) -> &str;

    /// Returns the prefix of `path` matched by this pattern, if any.
    fn match_prefix<'p>(&self, path: &'p str) -> Option<&'p str>;
}

/// Matches one path segment: everything up to the next `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentMatcher;

impl SegmentMatcher {
    pub const SOURCE: &'static str = "[^/]+";
}

impl PrefixMatcher for SegmentMatcher {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    fn match_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        let end = path.find('/').unwrap_or(path.len());
        (end > 0).then(|| &path[..end])
    }
}

/// Matches the whole remaining path (catch-all).
#[derive(Debug, Clone, Copy, Default)]
pub struct RestMatcher;

impl RestMatcher {
    pub const SOURCE: &'static str = ".+";
}

impl PrefixMatcher for RestMatcher {
    fn source(&self) -> &str {
        Self::SOURCE
    }

    fn match_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        (!path.is_empty()).then_some(path)
    }
}

/// Regular expression evaluated at the start of the remaining path.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    source: String,
    anchored: Regex,
}

impl RegexMatcher {
    /// Compile `source` anchored to the start of the input.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let anchored = Regex::new(&format!("^(?:{source})"))
            .map_err(|e| Error::invalid_pattern(&source, e.to_string()))?;
        Ok(Self { source, anchored })
    }
}

impl PrefixMatcher for RegexMatcher {
    fn source(&self) -> &str {
        &self.source
    }

    fn match_prefix<'p>(&self, path: &'p str) -> Option<&'p str> {
        self.anchored.find(path).map(|m| m.as_str())
    }
}

/// Characters with a meaning outside a character class.
const META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// True when `source` contains no regex metacharacters, i.e. it can only
/// ever match itself. `-`, `#`, `&` and `~` are plain text here.
pub fn is_literal_pattern(source: &str) -> bool {
    !source.contains(META)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_matcher() {
        let matcher = SegmentMatcher;
        assert_eq!(matcher.match_prefix("42/posts"), Some("42"));
        assert_eq!(matcher.match_prefix("42"), Some("42"));
        assert_eq!(matcher.match_prefix("/posts"), None);
        assert_eq!(matcher.match_prefix(""), None);
    }

    #[test]
    fn test_rest_matcher() {
        let matcher = RestMatcher;
        assert_eq!(matcher.match_prefix("a/b/c.txt"), Some("a/b/c.txt"));
        assert_eq!(matcher.match_prefix(""), None);
    }

    #[test]
    fn test_regex_matcher_is_prefix_anchored() {
        let matcher = RegexMatcher::new(r"\d+").unwrap();
        assert_eq!(matcher.match_prefix("123.json"), Some("123"));
        // A match later in the path does not count.
        assert_eq!(matcher.match_prefix("abc123"), None);
        assert_eq!(matcher.source(), r"\d+");
    }

    #[test]
    fn test_regex_matcher_alternation_stays_anchored() {
        let matcher = RegexMatcher::new("a|b").unwrap();
        assert_eq!(matcher.match_prefix("ba"), Some("b"));
        assert_eq!(matcher.match_prefix("ca"), None);
    }

    #[test]
    fn test_invalid_regex() {
        let err = RegexMatcher::new("[a-").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_literal_detection() {
        assert!(is_literal_pattern("new"));
        assert!(is_literal_pattern("v1"));
        assert!(!is_literal_pattern(r"\d+"));
        assert!(!is_literal_pattern("a.b"));
        assert!(!is_literal_pattern("a|b"));
        assert!(!is_literal_pattern("x{2}"));
    }

    #[test]
    fn test_literal_detection_allows_escapable_punctuation() {
        assert!(is_literal_pattern("my-page"));
        assert!(is_literal_pattern("a#b"));
        assert!(is_literal_pattern("tom&jerry"));
        assert!(is_literal_pattern("~user"));
    }
}
