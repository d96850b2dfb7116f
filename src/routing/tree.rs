//! Segment trie for a single HTTP method.
//!
//! # Responsibilities
//! - Insert compiled patterns, creating nodes segment by segment
//! - Look up request paths with backtracking across sibling kinds
//! - Reject dynamic segments that disagree at the same position
//!
//! # Design Decisions
//! - Precedence at every node: static > regex > named > wildcard
//! - A failed static branch falls back to the dynamic siblings, so `/a/b/d`
//!   still reaches `/a/:x/d` when `/a/b/c` also exists
//! - Re-inserting an identical pattern replaces the value (last write wins)

use std::collections::HashMap;

use regex::Regex;

use crate::routing::error::RouteError;
use crate::routing::params::Params;
use crate::routing::pattern::{compile, split_path, Segment};

/// A successful lookup.
#[derive(Debug)]
pub struct Match<'a, V> {
    /// Value registered for the matched pattern.
    pub value: &'a V,
    /// Pattern text as it was registered.
    pub pattern: &'a str,
    /// Bindings for every dynamic segment, in pattern order.
    pub params: Params,
}

#[derive(Debug)]
struct Endpoint<V> {
    pattern: String,
    value: V,
}

#[derive(Debug)]
struct ParamChild<V> {
    name: String,
    node: Node<V>,
}

#[derive(Debug)]
struct RegexChild<V> {
    name: String,
    source: String,
    regex: Regex,
    node: Node<V>,
}

#[derive(Debug)]
struct Node<V> {
    statics: HashMap<String, Node<V>>,
    regex: Option<Box<RegexChild<V>>>,
    named: Option<Box<ParamChild<V>>>,
    wildcard: Option<Box<ParamChild<V>>>,
    endpoint: Option<Endpoint<V>>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Self {
            statics: HashMap::new(),
            regex: None,
            named: None,
            wildcard: None,
            endpoint: None,
        }
    }
}

impl<V> Node<V> {
    fn search<'n>(&'n self, segments: &[&str], params: &mut Params) -> Option<&'n Endpoint<V>> {
        let Some((first, rest)) = segments.split_first() else {
            return self.endpoint.as_ref();
        };
        let mark = params.len();

        if let Some(child) = self.statics.get(*first) {
            if let Some(found) = child.search(rest, params) {
                return Some(found);
            }
            params.truncate(mark);
        }

        if let Some(child) = &self.regex {
            if child.regex.is_match(first) {
                params.push(&child.name, *first);
                if let Some(found) = child.node.search(rest, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.named {
            params.push(&child.name, *first);
            if let Some(found) = child.node.search(rest, params) {
                return Some(found);
            }
            params.truncate(mark);
        }

        if let Some(child) = &self.wildcard {
            if let Some(endpoint) = &child.node.endpoint {
                params.push(&child.name, segments.join("/"));
                return Some(endpoint);
            }
        }

        None
    }

    fn collect<'n>(&'n self, out: &mut Vec<&'n str>) {
        if let Some(endpoint) = &self.endpoint {
            out.push(&endpoint.pattern);
        }
        for child in self.statics.values() {
            child.collect(out);
        }
        if let Some(child) = &self.regex {
            child.node.collect(out);
        }
        if let Some(child) = &self.named {
            child.node.collect(out);
        }
        if let Some(child) = &self.wildcard {
            child.node.collect(out);
        }
    }
}

/// Trie of compiled route patterns.
#[derive(Debug)]
pub struct Tree<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }
}

impl<V> Tree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `pattern`.
    ///
    /// Returns the value previously registered for a structurally identical
    /// pattern, which this insertion replaced.
    pub fn insert(&mut self, pattern: &str, value: V) -> Result<Option<V>, RouteError> {
        let segments = compile(pattern)?;
        let conflict = |existing: String| RouteError::Conflict {
            pattern: pattern.to_string(),
            existing,
        };

        let mut node = &mut self.root;
        for segment in segments {
            node = match segment {
                Segment::Static(text) => node.statics.entry(text).or_default(),
                Segment::Named(name) => {
                    let child = node.named.get_or_insert_with(|| {
                        Box::new(ParamChild {
                            name: name.clone(),
                            node: Node::default(),
                        })
                    });
                    if child.name != name {
                        return Err(conflict(format!(":{}", child.name)));
                    }
                    &mut child.node
                }
                Segment::Regex {
                    name,
                    source,
                    regex,
                } => {
                    let child = node.regex.get_or_insert_with(|| {
                        Box::new(RegexChild {
                            name: name.clone(),
                            source: source.clone(),
                            regex,
                            node: Node::default(),
                        })
                    });
                    if child.name != name || child.source != source {
                        return Err(conflict(format!("{{{}:{}}}", child.name, child.source)));
                    }
                    &mut child.node
                }
                Segment::Wildcard(name) => {
                    let child = node.wildcard.get_or_insert_with(|| {
                        Box::new(ParamChild {
                            name: name.clone(),
                            node: Node::default(),
                        })
                    });
                    if child.name != name {
                        return Err(conflict(format!("*{}", child.name)));
                    }
                    &mut child.node
                }
            };
        }

        let previous = node.endpoint.replace(Endpoint {
            pattern: pattern.to_string(),
            value,
        });
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous.map(|endpoint| endpoint.value))
    }

    /// Find the most specific pattern matching `path`.
    pub fn lookup(&self, path: &str) -> Option<Match<'_, V>> {
        let segments = split_path(path);
        let mut params = Params::new();
        let endpoint = self.root.search(&segments, &mut params)?;
        Some(Match {
            value: &endpoint.value,
            pattern: &endpoint.pattern,
            params,
        })
    }

    /// Registered patterns, sorted.
    pub fn routes(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(patterns: &[&'static str]) -> Tree<&'static str> {
        let mut tree = Tree::new();
        for pattern in patterns {
            tree.insert(pattern, *pattern).unwrap();
        }
        tree
    }

    #[test]
    fn static_beats_named() {
        let tree = tree(&["/a/:x", "/a/b"]);
        let m = tree.lookup("/a/b").unwrap();
        assert_eq!(*m.value, "/a/b");
        assert!(m.params.is_empty());

        let m = tree.lookup("/a/c").unwrap();
        assert_eq!(*m.value, "/a/:x");
        assert_eq!(m.params.get("x"), Some("c"));
    }

    #[test]
    fn backtracks_out_of_static_branch() {
        let tree = tree(&["/a/b/c", "/a/:x/d"]);
        let m = tree.lookup("/a/b/d").unwrap();
        assert_eq!(*m.value, "/a/:x/d");
        assert_eq!(m.params.get("x"), Some("b"));
    }

    #[test]
    fn regex_before_named() {
        let tree = tree(&["/u/{id:\\d+}", "/u/:name"]);
        let m = tree.lookup("/u/42").unwrap();
        assert_eq!(*m.value, "/u/{id:\\d+}");
        assert_eq!(m.params.get("id"), Some("42"));

        let m = tree.lookup("/u/bob").unwrap();
        assert_eq!(*m.value, "/u/:name");
        assert_eq!(m.params.get("name"), Some("bob"));
    }

    #[test]
    fn failed_branch_leaves_no_bindings() {
        let tree = tree(&["/s/{id:\\d+}/x", "/s/*rest"]);
        let m = tree.lookup("/s/12/y").unwrap();
        assert_eq!(*m.value, "/s/*rest");
        assert_eq!(m.params.len(), 1);
        assert_eq!(m.params.get("rest"), Some("12/y"));
    }

    #[test]
    fn wildcard_needs_a_segment() {
        let tree = tree(&["/files/*rest"]);
        assert!(tree.lookup("/files").is_none());
        let m = tree.lookup("/files/a/b/c").unwrap();
        assert_eq!(m.params.get("rest"), Some("a/b/c"));
    }

    #[test]
    fn root_and_normalization() {
        let tree = tree(&["/", "/a/b"]);
        assert_eq!(*tree.lookup("").unwrap().value, "/");
        assert_eq!(*tree.lookup("///").unwrap().value, "/");
        assert_eq!(*tree.lookup("/a//b/").unwrap().value, "/a/b");
        assert!(tree.lookup("/a").is_none());
    }

    #[test]
    fn reinsert_replaces_value() {
        let mut tree = Tree::new();
        assert!(tree.insert("/x/:id", 1).unwrap().is_none());
        assert_eq!(tree.insert("/x/:id/", 2).unwrap(), Some(1));
        assert_eq!(tree.len(), 1);
        assert_eq!(*tree.lookup("/x/7").unwrap().value, 2);
    }

    #[test]
    fn conflicting_dynamic_segments() {
        let mut tree = Tree::new();
        tree.insert("/a/:x", ()).unwrap();
        assert!(matches!(
            tree.insert("/a/:y/b", ()),
            Err(RouteError::Conflict { existing, .. }) if existing == ":x"
        ));

        tree.insert("/r/{id:\\d+}", ()).unwrap();
        assert!(matches!(tree.insert("/r/{id:[a-z]+}", ()), Err(RouteError::Conflict { .. })));
        tree.insert("/r/{id:\\d+}/more", ()).unwrap();

        tree.insert("/w/*rest", ()).unwrap();
        assert!(matches!(tree.insert("/w/*other", ()), Err(RouteError::Conflict { .. })));
    }

    #[test]
    fn lists_routes() {
        let tree = tree(&["/b", "/a/:x", "/a/*rest"]);
        assert_eq!(tree.routes(), vec!["/a/*rest", "/a/:x", "/b"]);
    }
}
