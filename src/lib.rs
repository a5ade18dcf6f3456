//! # actionrouter
//!
//! **actionrouter** is an in-process action dispatcher: it maps string paths to
//! registered handlers, runs an ordered chain of interceptors around each
//! handler call, binds the handler's parameters from whatever values are
//! available and resolves the returned value through a pluggable
//! result protocol.
//!
//! ## Overview
//!
//! There is no transport here. Something else (an HTTP server, a message
//! consumer, a CLI) turns its input into a path plus arguments and calls
//! [`Dispatcher::invoke_action`].
//!
//! ## Architecture
//!
//! - **[`router`]** - segment trie with wildcard captures, route table with a
//!   two-tier resolution cache and suffix stripping
//! - **[`dispatcher`]** - registration surface, per-call invocation context and
//!   the interceptor chain
//! - **[`interceptor`]** - the interceptor trait plus metrics and tracing
//!   interceptors
//! - **[`binder`]** - type-driven parameter binding with optional memoized plans
//! - **[`result`]** - result descriptors, result types and the resolution cascade
//! - **[`action`]** - dynamic values, handler targets and handler factories
//! - **[`runtime_config`]** - configuration from defaults, environment or YAML
//! - **[`error`]** - the [`DispatchError`] taxonomy
//!
//! ### Request Handling Flow
//!
//! ```text
//! invoke_action("/orders/42.json", args)
//!   -> strip suffix            "/orders/42"
//!   -> exact cache / LRU cache / trie
//!   -> scope (prototype: fresh receiver)
//!   -> interceptor 1 .. n      each calls ctx.invoke() to continue
//!   -> bind parameters, run handler once
//!   -> result protocol         route result / type:location / global / hook
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use actionrouter::action::{ActionTarget, ParamType, Value};
//! use actionrouter::router::RouteDefinition;
//! use actionrouter::{Dispatcher, DispatcherConfig};
//!
//! let mut dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
//! let greet = ActionTarget::from_fn("greeter", vec![ParamType::of::<String>()], |args| {
//!     let name = args[0].as_ref().and_then(Value::as_str).unwrap_or("world");
//!     Ok(Some(Value::new(format!("hello, {name}"))))
//! });
//! dispatcher.add_route(RouteDefinition::new("/greet", greet)).unwrap();
//!
//! let reply = dispatcher
//!     .invoke_action("/greet", vec![Value::from("ferris")])
//!     .unwrap();
//! assert_eq!(reply.as_ref().and_then(Value::as_str), Some("hello, ferris"));
//! ```

pub mod action;
pub mod binder;
pub mod dispatcher;
pub mod error;
pub mod interceptor;
pub mod result;
pub mod router;
pub mod runtime_config;

pub use action::{ActionTarget, FactoryRegistry, HandlerFactory, Invocable, ParamType, Scope, Value};
pub use dispatcher::{Dispatcher, InvocationContext};
pub use error::DispatchError;
pub use interceptor::Interceptor;
pub use result::{ResultDescriptor, ResultType};
pub use router::{Captures, RouteDefinition};
pub use runtime_config::DispatcherConfig;
