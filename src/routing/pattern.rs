//! Route pattern parsing.
//!
//! A pattern such as `/users/:id/files/(\d+).json` becomes an ordered list of
//! [`Segment`]s: literal text and dynamic matchers. Markers:
//!
//! ```text
//! :name     one path segment, only at the start of a segment
//! *name     rest of the path, only at the start of the last segment
//! (regex)   prefix-anchored regular expression, anywhere
//! \c        the character c, taken literally
//! ```

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::routing::matcher::{
    is_literal_pattern, PrefixMatcher, RegexMatcher, RestMatcher, SegmentMatcher,
};

/// One piece of a parsed route.
#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Dynamic {
        matcher: Arc<dyn PrefixMatcher>,
        /// Name declared with `:name` or `*name`; `(regex)` groups are unnamed.
        name: Option<String>,
    },
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }

    /// Length of the text this segment contributes to tree comparisons.
    pub(crate) fn text_len(&self) -> usize {
        match self {
            Segment::Literal(text) => text.len(),
            Segment::Dynamic { matcher, .. } => matcher.source().len(),
        }
    }
}

/// Parse a route pattern into segments.
pub fn parse(pattern: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;
    let mut segment_start = true;

    while let Some(c) = rest.chars().next() {
        match c {
            ':' | '*' if segment_start => {
                let end = rest.find('/').unwrap_or(rest.len());
                let name = &rest[1..end];
                if name.is_empty() {
                    return Err(Error::invalid_pattern(pattern, "parameter without a name"));
                }
                if c == '*' && end != rest.len() {
                    return Err(Error::invalid_pattern(
                        pattern,
                        "catch-all parameter must be the last segment",
                    ));
                }
                let matcher: Arc<dyn PrefixMatcher> = if c == ':' {
                    Arc::new(SegmentMatcher)
                } else {
                    Arc::new(RestMatcher)
                };
                flush(&mut literal, &mut segments);
                segments.push(Segment::Dynamic {
                    matcher,
                    name: Some(name.to_string()),
                });
                rest = &rest[end..];
                segment_start = false;
            }
            '(' => {
                let close = closing_paren(rest)
                    .ok_or_else(|| Error::invalid_pattern(pattern, "unbalanced parenthesis"))?;
                let source = &rest[1..close];
                if source.is_empty() {
                    return Err(Error::invalid_pattern(pattern, "empty pattern group"));
                }
                if is_literal_pattern(source) {
                    literal.push_str(source);
                } else {
                    let matcher = RegexMatcher::new(source)?;
                    flush(&mut literal, &mut segments);
                    segments.push(Segment::Dynamic {
                        matcher: Arc::new(matcher),
                        name: None,
                    });
                }
                rest = &rest[close + 1..];
                segment_start = false;
            }
            '\\' => {
                let escaped = rest[1..]
                    .chars()
                    .next()
                    .ok_or_else(|| Error::invalid_pattern(pattern, "trailing escape"))?;
                literal.push(escaped);
                rest = &rest[1 + escaped.len_utf8()..];
                segment_start = false;
            }
            _ => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
                segment_start = c == '/';
            }
        }
    }
    flush(&mut literal, &mut segments);
    Ok(segments)
}

/// Parse a path that is matched literally, markers included.
pub fn literal(path: &str) -> Vec<Segment> {
    if path.is_empty() {
        Vec::new()
    } else {
        vec![Segment::Literal(path.to_string())]
    }
}

/// Names of the captures a parsed route produces, in capture order.
pub fn capture_names(segments: &[Segment]) -> Vec<Option<String>> {
    segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Dynamic { name, .. } => Some(name.clone()),
            Segment::Literal(_) => None,
        })
        .collect()
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

/// Byte index of the `)` closing the group that opens at `s[0]`.
/// Escapes and character classes are skipped.
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(segments: &[Segment]) -> Vec<String> {
        segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => format!("lit:{text}"),
                Segment::Dynamic { matcher, name } => {
                    format!("dyn:{}:{}", matcher.source(), name.as_deref().unwrap_or("-"))
                }
            })
            .collect()
    }

    #[test]
    fn test_parse_named_params() {
        let segments = parse("/users/:id/posts/:post").unwrap();
        assert_eq!(
            describe(&segments),
            vec![
                "lit:/users/",
                "dyn:[^/]+:id",
                "lit:/posts/",
                "dyn:[^/]+:post",
            ]
        );
    }

    #[test]
    fn test_parse_regex_group() {
        let segments = parse(r"/files/(\d+).json").unwrap();
        assert_eq!(
            describe(&segments),
            vec!["lit:/files/", r"dyn:\d+:-", "lit:.json"]
        );
    }

    #[test]
    fn test_parse_literal_group_is_merged() {
        let segments = parse("/users/(new)/edit").unwrap();
        assert_eq!(describe(&segments), vec!["lit:/users/new/edit"]);
    }

    #[test]
    fn test_parse_punctuated_literal_group_is_merged() {
        let segments = parse("/(my-page)").unwrap();
        assert_eq!(describe(&segments), vec!["lit:/my-page"]);
    }

    #[test]
    fn test_parse_catch_all() {
        let segments = parse("/static/*path").unwrap();
        assert_eq!(describe(&segments), vec!["lit:/static/", "dyn:.+:path"]);
        assert!(parse("/static/*path/more").is_err());
    }

    #[test]
    fn test_colon_inside_segment_is_literal() {
        let segments = parse("/time/12:30").unwrap();
        assert_eq!(describe(&segments), vec!["lit:/time/12:30"]);
    }

    #[test]
    fn test_escape() {
        let segments = parse(r"/\:id/\(x\)").unwrap();
        assert_eq!(describe(&segments), vec!["lit:/:id/(x)"]);
    }

    #[test]
    fn test_nested_and_class_parens() {
        let segments = parse(r"/((a|b)+)/([()]+)").unwrap();
        assert_eq!(
            describe(&segments),
            vec!["lit:/", "dyn:(a|b)+:-", "lit:/", "dyn:[()]+:-"]
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(parse("/users/:").is_err());
        assert!(parse("/users/(").is_err());
        assert!(parse("/users/()").is_err());
        assert!(parse(r"/users\").is_err());
        assert!(parse("/users/([a-)").is_err());
    }

    #[test]
    fn test_capture_names() {
        let segments = parse(r"/users/:id/(\d+)").unwrap();
        assert_eq!(capture_names(&segments), vec![Some("id".to_string()), None]);
    }

    #[test]
    fn test_literal_keeps_markers() {
        let segments = literal("/users/:id");
        assert_eq!(describe(&segments), vec!["lit:/users/:id"]);
        assert!(literal("").is_empty());
    }
}
