//! Route-matching prefix tree.
//!
//! # Responsibilities
//! - Insert routes, splitting literal nodes on partial prefix overlap
//! - Reject a second route for the same full path
//! - Look up a path, collecting the text consumed by dynamic nodes
//!
//! # Design Decisions
//! - Every literal child precedes every dynamic child, so static text wins
//! - Nodes own their children in a `Vec`; a node never has two parents
//! - Dynamic nodes merge only when their matcher sources are identical
//! - Lookup backtracks across siblings; first match wins, not longest

use std::fmt;
use std::mem;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::routing::matcher::PrefixMatcher;
use crate::routing::pattern::{self, Segment};

/// Result of a tree lookup.
#[derive(Debug)]
pub enum Match<'t, 'p, T> {
    /// A route terminates at the path.
    Found { value: &'t T, captures: Vec<&'p str> },
    /// The path reaches a waypoint that carries no route.
    Structural,
    /// No node matches the path.
    NotFound,
}

impl<'t, 'p, T> Match<'t, 'p, T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Match::Found { .. })
    }
}

/// A prefix tree mapping route patterns to values.
#[derive(Debug)]
pub struct Tree<T> {
    root: Node<T>,
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self { root: Node::root() }
    }

    /// Insert a route written in pattern syntax (`:name`, `*name`, `(regex)`).
    pub fn insert(&mut self, route: &str, value: T) -> Result<()> {
        let segments = pattern::parse(route)?;
        self.insert_segments(route, &segments, value)
    }

    /// Insert a path matched byte for byte, markers included.
    pub fn insert_literal(&mut self, path: &str, value: T) -> Result<()> {
        self.insert_segments(path, &pattern::literal(path), value)
    }

    /// Insert pre-parsed segments. `route` is only used for error messages.
    pub fn insert_segments(&mut self, route: &str, segments: &[Segment], value: T) -> Result<()> {
        if segments.is_empty() {
            return Err(Error::invalid_pattern(route, "empty route"));
        }
        match self.root.insert_child(segments, value) {
            Outcome::Inserted => Ok(()),
            Outcome::Conflict(_) | Outcome::NoMatch(_) => {
                Err(Error::RouteConflict(route.to_string()))
            }
        }
    }

    /// Find the value registered for `path` together with its captures.
    pub fn lookup<'t, 'p>(&'t self, path: &'p str) -> Match<'t, 'p, T> {
        let mut captures = Vec::new();
        match self.root.lookup_children(path, &mut captures) {
            Lookup::Found(value) => Match::Found { value, captures },
            Lookup::Structural => Match::Structural,
            Lookup::Miss => Match::NotFound,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Display for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write(f, "")
    }
}

#[derive(Debug)]
enum Kind {
    Root,
    Literal(String),
    Dynamic(Arc<dyn PrefixMatcher>),
}

/// Insertion outcome. The value travels back whenever it was not consumed.
enum Outcome<T> {
    NoMatch(T),
    Inserted,
    Conflict(T),
}

enum Lookup<'t, T> {
    Miss,
    Structural,
    Found(&'t T),
}

#[derive(Debug)]
struct Node<T> {
    kind: Kind,
    value: Option<T>,
    children: Vec<Node<T>>,
}

impl<T> Node<T> {
    fn root() -> Self {
        Self {
            kind: Kind::Root,
            value: None,
            children: Vec::new(),
        }
    }

    fn from_segment(segment: &Segment) -> Self {
        let kind = match segment {
            Segment::Literal(text) => Kind::Literal(text.clone()),
            Segment::Dynamic { matcher, .. } => Kind::Dynamic(Arc::clone(matcher)),
        };
        Self {
            kind,
            value: None,
            children: Vec::new(),
        }
    }

    fn is_dynamic(&self) -> bool {
        matches!(self.kind, Kind::Dynamic(_))
    }

    /// Length of the node's own text: the literal, or the matcher source.
    fn text_len(&self) -> usize {
        match &self.kind {
            Kind::Root => 0,
            Kind::Literal(text) => text.len(),
            Kind::Dynamic(matcher) => matcher.source().len(),
        }
    }

    /// Bytes of `segment` shared with this node's own text.
    fn common_prefix(&self, segment: &Segment) -> usize {
        match (&self.kind, segment) {
            (Kind::Literal(text), Segment::Literal(other)) => common_prefix_len(text, other),
            (Kind::Dynamic(matcher), Segment::Dynamic { matcher: other, .. })
                if matcher.source() == other.source() =>
            {
                self.text_len()
            }
            _ => 0,
        }
    }

    fn insert(&mut self, segments: &[Segment], value: T) -> Outcome<T> {
        let Some(head) = segments.first() else {
            return Outcome::NoMatch(value);
        };
        let common = self.common_prefix(head);
        if common == 0 {
            return Outcome::NoMatch(value);
        }
        if common < self.text_len() {
            self.split(common);
        }

        let rest = remainder(segments, common);
        if rest.is_empty() {
            if self.value.is_some() {
                return Outcome::Conflict(value);
            }
            self.value = Some(value);
            return Outcome::Inserted;
        }
        self.insert_child(&rest, value)
    }

    fn insert_child(&mut self, segments: &[Segment], mut value: T) -> Outcome<T> {
        for child in &mut self.children {
            match child.insert(segments, value) {
                Outcome::NoMatch(returned) => value = returned,
                outcome => return outcome,
            }
        }

        let mut child = Node::from_segment(&segments[0]);
        let outcome = child.insert(segments, value);
        self.attach(child);
        outcome
    }

    fn attach(&mut self, child: Node<T>) {
        let at = if child.is_dynamic() {
            self.children.len()
        } else {
            self.children
                .iter()
                .position(Node::is_dynamic)
                .unwrap_or(self.children.len())
        };
        self.children.insert(at, child);
    }

    /// Shrink a literal node to its first `at` bytes. The remainder moves to
    /// a new only child that inherits the value and the children.
    fn split(&mut self, at: usize) {
        let Kind::Literal(text) = &mut self.kind else {
            return;
        };
        let suffix = text.split_off(at);
        let child = Node {
            kind: Kind::Literal(suffix),
            value: self.value.take(),
            children: mem::take(&mut self.children),
        };
        self.children = vec![child];
    }

    fn lookup<'t, 'p>(&'t self, path: &'p str, captures: &mut Vec<&'p str>) -> Lookup<'t, T> {
        let consumed = match &self.kind {
            Kind::Root => 0,
            Kind::Literal(text) => {
                if !path.starts_with(text.as_str()) {
                    return Lookup::Miss;
                }
                text.len()
            }
            Kind::Dynamic(matcher) => match matcher.match_prefix(path) {
                Some(capture) if !capture.is_empty() => {
                    captures.push(capture);
                    capture.len()
                }
                _ => return Lookup::Miss,
            },
        };

        let rest = &path[consumed..];
        if rest.is_empty() {
            return match &self.value {
                Some(value) => Lookup::Found(value),
                None => Lookup::Structural,
            };
        }
        self.lookup_children(rest, captures)
    }

    fn lookup_children<'t, 'p>(
        &'t self,
        path: &'p str,
        captures: &mut Vec<&'p str>,
    ) -> Lookup<'t, T> {
        let mark = captures.len();
        let mut outcome = Lookup::Miss;
        for child in &self.children {
            match child.lookup(path, captures) {
                Lookup::Found(value) => return Lookup::Found(value),
                Lookup::Structural => outcome = Lookup::Structural,
                Lookup::Miss => {}
            }
            captures.truncate(mark);
        }
        outcome
    }
}

impl<T: fmt::Debug> Node<T> {
    fn write(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        let mut fields = Vec::new();
        match &self.kind {
            Kind::Root => {}
            Kind::Literal(text) => fields.push(format!("static: {text}")),
            Kind::Dynamic(matcher) => fields.push(format!("dynamic: {}", matcher.source())),
        }
        if let Some(value) = &self.value {
            fields.push(format!("route: {value:?}"));
        }
        write!(f, "{indent}{{")?;
        if !fields.is_empty() {
            write!(f, " {}", fields.join(", "))?;
        }
        if self.children.is_empty() {
            return write!(f, " }}");
        }
        if !fields.is_empty() {
            write!(f, ",")?;
        }
        writeln!(f, " children: [")?;
        let nested = format!("{indent}  ");
        for child in &self.children {
            child.write(f, &nested)?;
            writeln!(f)?;
        }
        write!(f, "{indent}] }}")
    }
}

/// Segments left after consuming `consumed` bytes of the first one.
fn remainder(segments: &[Segment], consumed: usize) -> Vec<Segment> {
    let (head, tail) = match segments.split_first() {
        Some(split) => split,
        None => return Vec::new(),
    };
    let mut rest = Vec::with_capacity(segments.len());
    if let Segment::Literal(text) = head {
        if consumed < text.len() {
            rest.push(Segment::Literal(text[consumed..].to_string()));
        }
    } else if consumed < head.text_len() {
        rest.push(head.clone());
    }
    rest.extend_from_slice(tail);
    rest
}

/// Longest common prefix in bytes, cut at a char boundary.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map_or(0, |((i, x), _)| i + x.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found<'t, 'p>(tree: &'t Tree<&'static str>, path: &'p str) -> Option<(&'static str, Vec<&'p str>)> {
        match tree.lookup(path) {
            Match::Found { value, captures } => Some((*value, captures)),
            _ => None,
        }
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len("/foo/bar", "/foo/baz"), 7);
        assert_eq!(common_prefix_len("abc", "xyz"), 0);
        assert_eq!(common_prefix_len("héllo", "hélp"), 4);
        assert_eq!(common_prefix_len("", "abc"), 0);
    }

    #[test]
    fn test_split_correctness() {
        let mut tree = Tree::new();
        tree.insert("/foo/bar", "bar").unwrap();
        tree.insert("/foo/baz", "baz").unwrap();

        assert_eq!(found(&tree, "/foo/bar"), Some(("bar", vec![])));
        assert_eq!(found(&tree, "/foo/baz"), Some(("baz", vec![])));
        assert!(matches!(tree.lookup("/foo"), Match::NotFound));
        assert!(matches!(tree.lookup("/foo/ba"), Match::Structural));
        assert!(matches!(tree.lookup("/other"), Match::NotFound));
        assert!(matches!(tree.lookup("/foo/bazz"), Match::NotFound));
    }

    #[test]
    fn test_split_shape() {
        let mut tree = Tree::new();
        tree.insert("/foo/bar", "bar").unwrap();
        tree.insert("/foo/baz", "baz").unwrap();

        let top = &tree.root.children[0];
        assert!(matches!(&top.kind, Kind::Literal(t) if t == "/foo/ba"));
        assert!(top.value.is_none());
        assert_eq!(top.children.len(), 2);
    }

    #[test]
    fn test_prefix_route_splits_existing_node() {
        let mut tree = Tree::new();
        tree.insert("/users/list", "list").unwrap();
        tree.insert("/users", "users").unwrap();

        assert_eq!(found(&tree, "/users"), Some(("users", vec![])));
        assert_eq!(found(&tree, "/users/list"), Some(("list", vec![])));
    }

    #[test]
    fn test_conflict_keeps_first_value() {
        let mut tree = Tree::new();
        tree.insert("/same", "first").unwrap();
        let err = tree.insert("/same", "second").unwrap_err();
        assert!(matches!(err, Error::RouteConflict(ref r) if r == "/same"));
        assert_eq!(found(&tree, "/same"), Some(("first", vec![])));
    }

    #[test]
    fn test_dynamic_conflict() {
        let mut tree = Tree::new();
        tree.insert("/users/:id", "a").unwrap();
        // Different capture names, same matcher: still the same route.
        assert!(tree.insert("/users/:uid", "b").is_err());
    }

    #[test]
    fn test_static_precedence() {
        let mut tree = Tree::new();
        tree.insert("/users/:id", "show").unwrap();
        tree.insert("/users/new", "new").unwrap();

        assert_eq!(found(&tree, "/users/new"), Some(("new", vec![])));
        assert_eq!(found(&tree, "/users/42"), Some(("show", vec!["42"])));
    }

    #[test]
    fn test_static_children_precede_dynamic() {
        let mut tree = Tree::new();
        tree.insert(r"/(\d+)", "digits").unwrap();
        tree.insert("/:slug", "slug").unwrap();
        tree.insert("/about", "about").unwrap();

        let slash = &tree.root.children[0];
        assert!(!slash.children[0].is_dynamic());
        assert!(slash.children[1].is_dynamic());
        assert!(slash.children[2].is_dynamic());
        assert_eq!(found(&tree, "/about"), Some(("about", vec![])));
        assert_eq!(found(&tree, "/12"), Some(("digits", vec!["12"])));
        assert_eq!(found(&tree, "/abc"), Some(("slug", vec!["abc"])));
    }

    #[test]
    fn test_backtracks_from_literal_to_dynamic() {
        let mut tree = Tree::new();
        tree.insert("/users/new", "new").unwrap();
        tree.insert("/users/:id", "show").unwrap();

        // "new" is a literal prefix of "newest" but leads nowhere.
        assert_eq!(found(&tree, "/users/newest"), Some(("show", vec!["newest"])));
    }

    #[test]
    fn test_capture_ordering() {
        let mut tree = Tree::new();
        tree.insert("/users/:id/posts/:post", "post").unwrap();

        assert_eq!(
            found(&tree, "/users/7/posts/99"),
            Some(("post", vec!["7", "99"]))
        );
    }

    #[test]
    fn test_failed_branch_drops_its_captures() {
        let mut tree = Tree::new();
        tree.insert("/:a/x", "x").unwrap();
        tree.insert(r"/(\w+)/y", "y").unwrap();

        assert_eq!(found(&tree, "/one/y"), Some(("y", vec!["one"])));
    }

    #[test]
    fn test_regex_and_catch_all() {
        let mut tree = Tree::new();
        tree.insert(r"/files/(\d+).json", "file").unwrap();
        tree.insert("/static/*path", "static").unwrap();

        assert_eq!(found(&tree, "/files/12.json"), Some(("file", vec!["12"])));
        assert!(!tree.lookup("/files/ab.json").is_found());
        assert_eq!(
            found(&tree, "/static/css/site.css"),
            Some(("static", vec!["css/site.css"]))
        );
        assert!(!tree.lookup("/static/").is_found());
    }

    #[test]
    fn test_literal_pattern_group_is_static() {
        let mut tree = Tree::new();
        tree.insert("/users/:id", "show").unwrap();
        tree.insert("/users/(new)", "new").unwrap();

        assert_eq!(found(&tree, "/users/new"), Some(("new", vec![])));
    }

    #[test]
    fn test_punctuated_literal_group_beats_earlier_param() {
        let mut tree = Tree::new();
        tree.insert("/:slug", "slug").unwrap();
        tree.insert("/(my-page)", "page").unwrap();

        assert_eq!(found(&tree, "/my-page"), Some(("page", vec![])));
        assert_eq!(found(&tree, "/other"), Some(("slug", vec!["other"])));
    }

    #[test]
    fn test_insert_literal_ignores_markers() {
        let mut tree = Tree::new();
        tree.insert_literal("/odd/:id", "raw").unwrap();

        assert_eq!(found(&tree, "/odd/:id"), Some(("raw", vec![])));
        assert!(!tree.lookup("/odd/42").is_found());
    }

    #[test]
    fn test_empty_route_rejected() {
        let mut tree: Tree<()> = Tree::new();
        assert!(tree.insert("", ()).is_err());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_display() {
        let mut tree = Tree::new();
        tree.insert("/a", 1).unwrap();
        tree.insert("/:b", 2).unwrap();

        let rendered = tree.to_string();
        assert!(rendered.contains("static: /"));
        assert!(rendered.contains("static: a, route: 1"));
        assert!(rendered.contains("dynamic: [^/]+, route: 2"));
        assert!(rendered.starts_with("{ children: [\n"));
        assert!(!rendered.contains("{  "));
    }
}
