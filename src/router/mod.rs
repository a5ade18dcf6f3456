//! # Router Module
//!
//! Maps action paths to registered routes.
//!
//! ## Overview
//!
//! - [`PathTree`] is a segment trie with literal and wildcard segments and a
//!   deterministic tie-break between overlapping patterns.
//! - [`RouteTable`] owns the trie, strips the configured suffix from incoming
//!   paths and caches resolutions in two tiers.
//! - [`Route`] is one registered binding; [`RouteDefinition`] is what callers
//!   hand to the dispatcher to create one.
//!
//! ## Example
//!
//! ```rust
//! use actionrouter::action::ActionTarget;
//! use actionrouter::router::{RouteTable, SuffixRule};
//! use actionrouter::Dispatcher;
//! use actionrouter::router::RouteDefinition;
//!
//! let mut dispatcher = Dispatcher::default();
//! let target = ActionTarget::from_fn("pets#show", Vec::new(), |_| Ok(None));
//! dispatcher.add_route(RouteDefinition::new("/pets/{id}", target)).unwrap();
//!
//! let entry = dispatcher.resolve("/pets/123").unwrap();
//! assert_eq!(entry.route.path(), "/pets/{id}");
//! assert_eq!(entry.captures.get("id"), Some("123"));
//!
//! let table = RouteTable::new('/', SuffixRule::parse(Some(".json")), 100);
//! assert_eq!(table.strip_suffix("/pets/123.json"), "/pets/123");
//! ```

mod core;
mod route;
mod tree;

pub use core::{CacheEntry, CacheStats, CaptureVec, Captures, RouteTable, SuffixRule, MAX_INLINE_CAPTURES};
pub use route::{Route, RouteDefinition};
pub use tree::{PathTree, MAX_DEPTH, WILDCARD};
