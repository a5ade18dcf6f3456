//! # Dispatcher Module
//!
//! The call surface: `invoke_action(path, args)` resolves the path, builds a
//! per-call [`InvocationContext`], drives the interceptor chain and runs the
//! result protocol on whatever the chain returned.
//!
//! ## Request Flow
//!
//! 1. The configured suffix is stripped and the path resolved through the
//!    route table (cache first, trie on a miss)
//! 2. Prototype-scoped routes get a fresh handler receiver
//! 3. Interceptors run in registration order, each deciding whether to
//!    continue with `ctx.invoke()`
//! 4. At the end of the chain the handler's arguments are bound and it runs
//!    exactly once
//! 5. The returned value goes through result resolution
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use actionrouter::action::{ActionTarget, ParamType, Value};
//! use actionrouter::interceptor;
//! use actionrouter::result::{self, ResultDescriptor};
//! use actionrouter::router::{Captures, RouteDefinition};
//! use actionrouter::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::default();
//! dispatcher
//!     .add_interceptor("audit", interceptor::from_fn(|ctx| Ok(ctx.invoke()?)))
//!     .unwrap();
//! dispatcher
//!     .add_result_type("text", result::from_fn(|ctx| {
//!         let location = ctx.and_then(|c| c.result_descriptor()).map(|d| d.location.clone());
//!         Ok(location.map(Value::new))
//!     }))
//!     .unwrap();
//!
//! let show = ActionTarget::from_fn("pets#show", vec![ParamType::of::<Captures>()], |args| {
//!     let id = args[0]
//!         .as_ref()
//!         .and_then(|v| v.downcast_ref::<Captures>())
//!         .and_then(|c| c.get("id"))
//!         .unwrap_or_default();
//!     Ok(Some(Value::new(if id == "0" { "missing".to_string() } else { "ok".to_string() })))
//! });
//! dispatcher
//!     .add_route(
//!         RouteDefinition::new("/pets/{id}", show)
//!             .interceptor("audit")
//!             .result(ResultDescriptor::new("ok", "text", "pet page")),
//!     )
//!     .unwrap();
//!
//! let dispatcher = Arc::new(dispatcher);
//! let page = dispatcher.invoke_action("/pets/7", Vec::new()).unwrap();
//! assert_eq!(page.as_ref().and_then(Value::as_str), Some("pet page"));
//!
//! // unmapped strings pass through unchanged
//! let missing = dispatcher.invoke_action("/pets/0", Vec::new()).unwrap();
//! assert_eq!(missing.as_ref().and_then(Value::as_str), Some("missing"));
//! ```

mod context;
mod core;

pub use context::InvocationContext;
pub use core::Dispatcher;
