//! Route table: the trie plus suffix stripping and the resolution cache.
//!
//! Resolution runs the (suffix-stripped) path through two cache tiers before
//! falling back to the trie:
//!
//! - the **exact** tier holds paths spelled exactly like the literal route
//!   they resolved to. It is bounded by the number of routes and never evicts.
//! - the **matched** tier holds everything else: paths that went through a
//!   wildcard and other spellings of literal routes (`/a//b/` for `/a/b`).
//!   Those are unbounded in number, so the tier is an LRU of fixed capacity.
//!
//! A non-positive capacity disables both tiers.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use lru::LruCache;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::route::Route;
use super::tree::PathTree;
use crate::error::{DispatchError, RegistrationKind};

/// Captures kept inline before spilling to the heap.
pub const MAX_INLINE_CAPTURES: usize = 8;

/// Capture storage: names come from the trie, values from the query path.
pub type CaptureVec = SmallVec<[(Arc<str>, String); MAX_INLINE_CAPTURES]>;

/// Values captured by the wildcards of a matched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(CaptureVec);

impl Captures {
    /// Captured value by name.
    ///
    /// Uses "last write wins" semantics: a named wildcard repeated at different
    /// depths (`/org/{id}/user/{id}`) yields the deepest capture.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|(key, _)| key.as_ref() == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_ref(), value.as_str()))
    }

    /// Copy into an owned map. Allocates; prefer [`Captures::get`] per call.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }
}

impl FromIterator<(Arc<str>, String)> for Captures {
    fn from_iter<I: IntoIterator<Item = (Arc<str>, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How a configured extension is removed from incoming paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SuffixRule {
    #[default]
    None,
    /// A single non-alphanumeric character: truncate at its last occurrence.
    Delimiter(char),
    /// A literal extension: removed only from the very end of the path.
    Literal(String),
}

impl SuffixRule {
    /// Classify a configured suffix. Empty or absent means no stripping.
    #[must_use]
    pub fn parse(suffix: Option<&str>) -> Self {
        let Some(suffix) = suffix.filter(|s| !s.is_empty()) else {
            return SuffixRule::None;
        };
        let mut chars = suffix.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_alphanumeric() => SuffixRule::Delimiter(c),
            _ => SuffixRule::Literal(suffix.to_string()),
        }
    }

    /// Remove the suffix from `path`.
    ///
    /// A literal suffix also takes one non-alphanumeric boundary character
    /// with it, so `.do` and `do` both strip `/a/list.do` to `/a/list`.
    #[must_use]
    pub fn strip<'p>(&self, path: &'p str) -> &'p str {
        match self {
            SuffixRule::None => path,
            SuffixRule::Delimiter(delimiter) => path.rfind(*delimiter).map_or(path, |at| &path[..at]),
            SuffixRule::Literal(suffix) => {
                let Some(head) = path.strip_suffix(suffix.as_str()) else {
                    return path;
                };
                match head.chars().next_back() {
                    Some(boundary) if !boundary.is_alphanumeric() => {
                        &head[..head.len() - boundary.len_utf8()]
                    }
                    _ => head,
                }
            }
        }
    }
}

/// A resolved route together with what its wildcards captured.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub route: Arc<Route>,
    pub captures: Arc<Captures>,
}

/// Snapshot of the resolution cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub exact_entries: usize,
    pub matched_entries: usize,
    /// Capacity of the matched tier; `0` when caching is disabled.
    pub capacity: usize,
}

/// All registered routes, indexed by a [`PathTree`] and fronted by the cache.
pub struct RouteTable {
    tree: PathTree<Arc<Route>>,
    paths: HashSet<String>,
    suffix: SuffixRule,
    exact: Option<DashMap<String, CacheEntry>>,
    matched: Option<Mutex<LruCache<String, CacheEntry>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RouteTable {
    #[must_use]
    pub fn new(separator: char, suffix: SuffixRule, cache_capacity: i64) -> Self {
        let capacity = usize::try_from(cache_capacity)
            .ok()
            .and_then(NonZeroUsize::new);
        if capacity.is_none() {
            debug!(cache_capacity, "Route resolution cache disabled");
        }
        Self {
            tree: PathTree::new(separator),
            paths: HashSet::new(),
            suffix,
            exact: capacity.map(|_| DashMap::new()),
            matched: capacity.map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn separator(&self) -> char {
        self.tree.separator()
    }

    #[must_use]
    pub fn suffix(&self) -> &SuffixRule {
        &self.suffix
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Register a route.
    ///
    /// A byte-identical path is rejected. A path overlapping an existing route
    /// is accepted with a warning; when both patterns normalize to the same
    /// trie node (`/u/{id}` and `/u/{name}`) the newer route replaces the older.
    pub fn insert(&mut self, route: Route) -> Result<Arc<Route>, DispatchError> {
        if self.paths.contains(route.path()) {
            return Err(DispatchError::DuplicateRegistration {
                kind: RegistrationKind::Route,
                name: route.path().to_string(),
            });
        }
        if let Some((existing, _)) = self.tree.get(route.path()) {
            warn!(
                path = %route.path(),
                existing = %existing.path(),
                "Route overlaps an existing route"
            );
        }

        let route = Arc::new(route);
        let replaced = self.tree.insert(route.path(), Arc::clone(&route))?;
        self.paths.insert(route.path().to_string());
        if let Some(replaced) = replaced {
            warn!(
                path = %route.path(),
                replaced = %replaced.path(),
                "Route pattern replaces an equivalent wildcard pattern"
            );
            self.paths.remove(replaced.path());
        }
        self.clear_cache();
        Ok(route)
    }

    /// Strip the configured suffix from `path`.
    #[must_use]
    pub fn strip_suffix<'p>(&self, path: &'p str) -> &'p str {
        self.suffix.strip(path)
    }

    /// Resolve a path to its route and captures, consulting the cache first.
    pub fn resolve(&self, path: &str) -> Result<CacheEntry, DispatchError> {
        let path = self.suffix.strip(path);

        if let Some(exact) = &self.exact {
            if let Some(entry) = exact.get(path) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry.value().clone());
            }
        }
        if let Some(matched) = &self.matched {
            let cached = lock(matched).get(path).cloned();
            if let Some(entry) = cached {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(entry);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let Some((route, captures)) = self.tree.get(path) else {
            debug!(path = %path, "No route matches path");
            return Err(DispatchError::RouteNotFound {
                path: path.to_string(),
            });
        };
        let entry = CacheEntry {
            route: Arc::clone(route),
            captures: Arc::new(captures),
        };
        debug!(
            path = %path,
            route = %entry.route.path(),
            captures = entry.captures.len(),
            "Route resolved from trie"
        );

        if entry.captures.is_empty() && path == entry.route.path() {
            if let Some(exact) = &self.exact {
                exact.insert(path.to_string(), entry.clone());
            }
        } else if let Some(matched) = &self.matched {
            let evicted = lock(matched).push(path.to_string(), entry.clone());
            if let Some((evicted, _)) = evicted.filter(|(key, _)| key != path) {
                debug!(path = %evicted, "Evicted least recently used path");
            }
        }
        Ok(entry)
    }

    /// Forget every cached resolution.
    pub fn clear_cache(&self) {
        if let Some(exact) = &self.exact {
            exact.clear();
        }
        if let Some(matched) = &self.matched {
            lock(matched).clear();
        }
    }

    /// Remove every route and cached resolution.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.paths.clear();
        self.clear_cache();
        info!("Route table cleared");
    }

    /// Every route currently served, in trie order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.tree.values().into_iter().map(Arc::clone).collect()
    }

    /// Log the routing table.
    pub fn dump_routes(&self) {
        info!(routes_count = self.len(), "Routing table");
        for route in self.tree.values() {
            let interceptors: Vec<&str> = route.interceptors().iter().map(|i| i.name()).collect();
            info!(
                path = %route.path(),
                handler = %route.target().type_name(),
                scope = ?route.scope(),
                interceptors = ?interceptors,
                "Route"
            );
        }
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            exact_entries: self.exact.as_ref().map_or(0, DashMap::len),
            matched_entries: self.matched.as_ref().map_or(0, |m| lock(m).len()),
            capacity: self.matched.as_ref().map_or(0, |m| lock(m).cap().get()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
