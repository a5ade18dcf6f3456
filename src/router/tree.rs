//! Segment trie for action path matching
//!
//! Paths are split on the separator into non-empty segments; each trie level
//! holds one segment. Segments are either literals or wildcards, and every
//! wildcard is stored under the single canonical label `*`, so all wildcard
//! patterns at a level share one edge.
//!
//! ## Wildcards
//!
//! - `*` is an anonymous wildcard
//! - `{name}`, `[name]` and `(name)` are named wildcards
//!
//! Captures are named by position: the first wildcard of a path is `*`, the
//! second `*2`, the third `*3` and so on. A named wildcard is also captured under
//! its own name, unless that name is itself positional (`{*}`, `{*2}`).
//!
//! ## Match codes
//!
//! Every node carries a match code built bit by bit from the root down: the
//! root is `1` and each level shifts left, setting the new low bit for a literal
//! segment. When several stored paths match a query, the largest code wins:
//! a literal at a shallower level beats anything that is only literal deeper
//! down, and a literal beats a wildcard at the same level. The code must fit a
//! `u32`, which bounds the trie at [`MAX_DEPTH`] levels below the root.
//!
//! ## Example
//!
//! ```rust
//! use actionrouter::router::PathTree;
//!
//! let mut tree = PathTree::new('/');
//! tree.insert("/orders/{id}", "by-id").unwrap();
//! tree.insert("/orders/latest", "latest").unwrap();
//!
//! let (value, captures) = tree.get("/orders/42").unwrap();
//! assert_eq!(*value, "by-id");
//! assert_eq!(captures.get("*"), Some("42"));
//! assert_eq!(captures.get("id"), Some("42"));
//!
//! let (value, captures) = tree.get("/orders/latest").unwrap();
//! assert_eq!(*value, "latest");
//! assert!(captures.is_empty());
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use super::core::Captures;
use crate::error::DispatchError;

/// Canonical label of every wildcard edge.
pub const WILDCARD: &str = "*";

/// Deepest path the trie accepts; one bit of the `u32` match code per level.
pub const MAX_DEPTH: usize = 31;

const ROOT_MATCH_CODE: u32 = 1;

const WILDCARD_DELIMITERS: [(char, char); 3] = [('{', '}'), ('[', ']'), ('(', ')')];

type Segments<'a> = SmallVec<[&'a str; 16]>;

enum Segment<'a> {
    Literal(&'a str),
    Wildcard(Option<&'a str>),
}

impl<'a> Segment<'a> {
    fn classify(segment: &'a str) -> Self {
        if segment == WILDCARD {
            return Segment::Wildcard(None);
        }
        for (open, close) in WILDCARD_DELIMITERS {
            let inner = segment
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close));
            if let Some(name) = inner.filter(|name| !name.is_empty()) {
                return Segment::Wildcard(Some(name));
            }
        }
        Segment::Literal(segment)
    }

    fn label(&self) -> &'a str {
        match self {
            Segment::Literal(text) => *text,
            Segment::Wildcard(_) => WILDCARD,
        }
    }

    fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

struct TrieNode<V> {
    match_code: u32,
    value: Option<V>,
    /// `(segment index, capture name)` pairs, recomputed whenever a value is attached
    capture_keys: Vec<(usize, Arc<str>)>,
    children: BTreeMap<Box<str>, TrieNode<V>>,
}

impl<V> TrieNode<V> {
    fn new(match_code: u32) -> Self {
        Self {
            match_code,
            value: None,
            capture_keys: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a V>) {
        if let Some(value) = &self.value {
            out.push(value);
        }
        for child in self.children.values() {
            child.collect(out);
        }
    }
}

/// Ordered segment trie holding at most one value per distinct path pattern.
pub struct PathTree<V> {
    root: TrieNode<V>,
    separator: char,
    len: usize,
}

impl<V> PathTree<V> {
    #[must_use]
    pub fn new(separator: char) -> Self {
        Self {
            root: TrieNode::new(ROOT_MATCH_CODE),
            separator,
            len: 0,
        }
    }

    #[must_use]
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every node and value.
    pub fn clear(&mut self) {
        self.root = TrieNode::new(ROOT_MATCH_CODE);
        self.len = 0;
    }

    /// All stored values, in trie order (parents first, children by label).
    #[must_use]
    pub fn values(&self) -> Vec<&V> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out
    }

    fn split<'p>(&self, path: &'p str) -> Segments<'p> {
        path.split(self.separator)
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// Store `value` at `path`, returning the value previously stored there.
    ///
    /// A path without segments (the bare separator) addresses the root. Patterns
    /// that differ only in wildcard names address the same node.
    pub fn insert(&mut self, path: &str, value: V) -> Result<Option<V>, DispatchError> {
        let segments = self.split(path);
        if segments.len() > MAX_DEPTH {
            return Err(DispatchError::DepthOverflow {
                path: path.to_string(),
                depth: segments.len(),
                max: MAX_DEPTH,
            });
        }

        let mut node = &mut self.root;
        for segment in &segments {
            let segment = Segment::classify(segment);
            let match_code = (node.match_code << 1) | u32::from(segment.is_literal());
            node = node
                .children
                .entry(Box::from(segment.label()))
                .or_insert_with(|| TrieNode::new(match_code));
        }

        node.capture_keys = capture_keys(&segments);
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Find the best stored match for `path` and the values its wildcards captured.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<(&V, Captures)> {
        let segments = self.split(path);
        let Some(last) = segments.len().checked_sub(1) else {
            return self.root.value.as_ref().map(|value| (value, Captures::default()));
        };

        let mut candidates: SmallVec<[&TrieNode<V>; 8]> = smallvec![&self.root];
        for (depth, segment) in segments.iter().enumerate() {
            let is_final = depth == last;
            let mut next: SmallVec<[&TrieNode<V>; 8]> = SmallVec::new();
            for node in &candidates {
                let literal = node.children.get(*segment);
                // A query segment spelled `*` reaches the wildcard edge through the literal lookup already.
                let wildcard = if *segment == WILDCARD {
                    None
                } else {
                    node.children.get(WILDCARD)
                };
                for child in literal.into_iter().chain(wildcard) {
                    if !is_final || child.value.is_some() {
                        next.push(child);
                    }
                }
            }
            if next.is_empty() {
                return None;
            }
            candidates = next;
        }

        let winner = candidates.into_iter().max_by_key(|node| node.match_code)?;
        let value = winner.value.as_ref()?;
        let captures = winner
            .capture_keys
            .iter()
            .filter_map(|(index, name)| {
                segments
                    .get(*index)
                    .map(|text| (Arc::clone(name), (*text).to_string()))
            })
            .collect();
        Some((value, captures))
    }
}

fn capture_keys(segments: &[&str]) -> Vec<(usize, Arc<str>)> {
    let mut keys = Vec::new();
    let mut ordinal = 0_usize;
    for (index, segment) in segments.iter().enumerate() {
        let Segment::Wildcard(name) = Segment::classify(segment) else {
            continue;
        };
        ordinal += 1;
        let positional: Arc<str> = if ordinal == 1 {
            Arc::from(WILDCARD)
        } else {
            Arc::from(format!("{WILDCARD}{ordinal}"))
        };
        keys.push((index, positional));
        if let Some(name) = name.filter(|name| !is_positional_name(name)) {
            keys.push((index, Arc::from(name)));
        }
    }
    keys
}

/// `*`, `*2`, `*3`, ... are reserved for positional captures.
fn is_positional_name(name: &str) -> bool {
    name.strip_prefix(WILDCARD)
        .is_some_and(|ordinal| ordinal.bytes().all(|b| b.is_ascii_digit()))
}
