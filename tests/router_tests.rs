use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use actionrouter::error::RegistrationKind;
use actionrouter::router::{PathTree, RouteDefinition, MAX_DEPTH};
use actionrouter::{DispatchError, Dispatcher, DispatcherConfig};

mod common;
use common::handlers::returning;
use common::tracing_util::TestTracing;

fn dispatcher_with(config: DispatcherConfig, paths: &[&str]) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(config).unwrap();
    for path in paths {
        dispatcher
            .add_route(RouteDefinition::new(*path, returning(path, "ok")))
            .unwrap();
    }
    dispatcher
}

fn dispatcher(paths: &[&str]) -> Dispatcher {
    dispatcher_with(DispatcherConfig::default(), paths)
}

fn matched(dispatcher: &Dispatcher, path: &str) -> String {
    dispatcher.resolve(path).unwrap().route.path().to_string()
}

#[test]
fn test_every_registered_literal_path_resolves_to_itself() {
    let paths = ["/", "/users", "/users/list", "/users/list/all", "/admin/users"];
    let dispatcher = dispatcher(&paths);
    for path in paths {
        let entry = dispatcher.resolve(path).unwrap();
        assert_eq!(entry.route.path(), path);
        assert!(entry.captures.is_empty());
    }
}

#[test]
fn test_unknown_path_is_route_not_found() {
    let dispatcher = dispatcher(&["/users/list"]);
    let err = dispatcher.resolve("/users/missing").unwrap_err();
    assert!(matches!(err, DispatchError::RouteNotFound { ref path } if path == "/users/missing"));
    assert!(dispatcher.invoke_action("/nowhere", Vec::new()).is_err());
}

#[test]
fn test_literal_beats_wildcard_regardless_of_registration_order() {
    for paths in [["/a/*/c", "/a/b/c"], ["/a/b/c", "/a/*/c"]] {
        let dispatcher = dispatcher(&paths);
        assert_eq!(matched(&dispatcher, "/a/b/c"), "/a/b/c");
        assert_eq!(matched(&dispatcher, "/a/q/c"), "/a/*/c");
    }
}

#[test]
fn test_shallower_literal_wins_between_two_partial_literals() {
    let dispatcher = dispatcher(&["/shop/*/items", "/shop/books/*"]);
    assert_eq!(matched(&dispatcher, "/shop/books/items"), "/shop/books/*");
    assert_eq!(matched(&dispatcher, "/shop/toys/items"), "/shop/*/items");
}

#[test]
fn test_wildcards_capture_by_position() {
    let dispatcher = dispatcher(&["/a/*/c/*"]);
    let entry = dispatcher.resolve("/a/X/c/Y").unwrap();
    let expected: HashMap<String, String> = [("*", "X"), ("*2", "Y")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    assert_eq!(entry.captures.to_map(), expected);
}

#[test]
fn test_named_wildcards_capture_by_name_and_position() {
    let dispatcher = dispatcher(&["/orgs/{org}/repos/[repo]"]);
    let entry = dispatcher.resolve("/orgs/rust-lang/repos/cargo").unwrap();
    assert_eq!(entry.captures.get("org"), Some("rust-lang"));
    assert_eq!(entry.captures.get("*"), Some("rust-lang"));
    assert_eq!(entry.captures.get("repo"), Some("cargo"));
    assert_eq!(entry.captures.get("*2"), Some("cargo"));
}

#[test]
fn test_tree_overwrite_is_idempotent() {
    let mut tree = PathTree::new('/');
    tree.insert("/x/*", 7).unwrap();
    let before = tree.get("/x/1").map(|(v, c)| (*v, c));
    assert_eq!(tree.insert("/x/*", 7).unwrap(), Some(7));
    let after = tree.get("/x/1").map(|(v, c)| (*v, c));
    assert_eq!(before, after);
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_cached_resolutions_share_route_and_captures() {
    let dispatcher = dispatcher(&["/static/page", "/items/{id}"]);

    let first = dispatcher.resolve("/static/page").unwrap();
    let second = dispatcher.resolve("/static/page").unwrap();
    assert!(Arc::ptr_eq(&first.route, &second.route));

    let first = dispatcher.resolve("/items/9").unwrap();
    let second = dispatcher.resolve("/items/9").unwrap();
    assert!(Arc::ptr_eq(&first.route, &second.route));
    assert!(Arc::ptr_eq(&first.captures, &second.captures));

    let stats = dispatcher.route_table().cache_stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.exact_entries, 1);
    assert_eq!(stats.matched_entries, 1);
}

#[test]
fn test_non_positive_cache_size_persists_nothing() {
    for cache_size in [0, -5] {
        let config = DispatcherConfig {
            cache_size,
            ..DispatcherConfig::default()
        };
        let dispatcher = dispatcher_with(config, &["/static/page", "/items/{id}"]);
        for _ in 0..3 {
            dispatcher.resolve("/static/page").unwrap();
            dispatcher.resolve("/items/9").unwrap();
        }
        let stats = dispatcher.route_table().cache_stats();
        assert_eq!(stats.exact_entries + stats.matched_entries, 0);
        assert_eq!(stats.hits, 0);
    }
}

#[test]
fn test_duplicate_path_fails_but_overlap_only_warns() {
    let tracing = TestTracing::init();
    let mut dispatcher = dispatcher(&["/a/*/c"]);

    let err = dispatcher
        .add_route(RouteDefinition::new("/a/*/c", returning("dup", "ok")))
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::DuplicateRegistration {
            kind: RegistrationKind::Route,
            ..
        }
    ));
    assert!(err.is_registration());

    dispatcher
        .add_route(RouteDefinition::new("/a/b/c", returning("literal", "ok")))
        .unwrap();
    assert!(tracing.contains("Route overlaps an existing route"));
    assert_eq!(dispatcher.route_table().len(), 2);
}

#[test]
fn test_too_deep_path_is_rejected() {
    let mut dispatcher = Dispatcher::default();
    let deep = "/d".repeat(MAX_DEPTH + 1);
    let err = dispatcher
        .add_route(RouteDefinition::new(deep, returning("deep", "ok")))
        .unwrap_err();
    assert!(matches!(err, DispatchError::DepthOverflow { max, .. } if max == MAX_DEPTH));
    assert!(dispatcher.route_table().is_empty());
}

#[test]
fn test_configured_suffix_is_stripped() {
    let literal = DispatcherConfig {
        suffix: Some("do".to_string()),
        ..DispatcherConfig::default()
    };
    let dispatcher = dispatcher_with(literal, &["/orders/list"]);
    assert_eq!(matched(&dispatcher, "/orders/list.do"), "/orders/list");
    assert_eq!(matched(&dispatcher, "/orders/list"), "/orders/list");

    let delimiter = DispatcherConfig {
        suffix: Some(".".to_string()),
        ..DispatcherConfig::default()
    };
    let dispatcher = dispatcher_with(delimiter, &["/orders/{id}"]);
    let entry = dispatcher.resolve("/orders/42.json").unwrap();
    assert_eq!(entry.captures.get("id"), Some("42"));
}

#[test]
fn test_custom_separator() {
    let config = DispatcherConfig {
        separator: '.',
        ..DispatcherConfig::default()
    };
    let dispatcher = dispatcher_with(config, &["orders.{id}.lines"]);
    let entry = dispatcher.resolve("orders.5.lines").unwrap();
    assert_eq!(entry.route.path(), "orders.{id}.lines");
    assert_eq!(entry.captures.get("id"), Some("5"));
}

#[test]
fn test_concurrent_resolution_is_consistent() {
    let dispatcher = Arc::new(dispatcher(&["/users/list", "/users/{id}", "/users/{id}/posts/*"]));
    thread::scope(|scope| {
        for worker in 0..8 {
            let dispatcher = Arc::clone(&dispatcher);
            scope.spawn(move || {
                for i in 0..200 {
                    let id = (worker * 31 + i) % 50;
                    assert_eq!(matched(&dispatcher, "/users/list"), "/users/list");
                    let entry = dispatcher.resolve(&format!("/users/{id}")).unwrap();
                    assert_eq!(entry.captures.get("id"), Some(id.to_string().as_str()));
                    let entry = dispatcher.resolve(&format!("/users/{id}/posts/p{i}")).unwrap();
                    assert_eq!(entry.route.path(), "/users/{id}/posts/*");
                    assert_eq!(entry.captures.get("*2"), Some(format!("p{i}").as_str()));
                }
            });
        }
    });
    let stats = dispatcher.route_table().cache_stats();
    assert_eq!(stats.hits + stats.misses, 8 * 200 * 3);
}

#[test]
fn test_clear_routes_and_dump() {
    let tracing = TestTracing::init();
    let mut dispatcher = dispatcher(&["/b", "/a"]);
    let listed: Vec<String> = dispatcher
        .route_table()
        .routes()
        .iter()
        .map(|route| route.path().to_string())
        .collect();
    assert_eq!(listed, vec!["/a", "/b"]);

    dispatcher.route_table().dump_routes();
    assert!(tracing.contains("routes_count=2"));

    dispatcher.clear_routes();
    assert!(dispatcher.resolve("/a").is_err());
}
