//! # Interceptor Module
//!
//! Interceptors wrap handler execution. Each one receives the per-call
//! [`InvocationContext`](crate::dispatcher::InvocationContext) and decides
//! whether to continue the chain by calling `ctx.invoke()`, so it can run code
//! before and after the rest of the chain or short-circuit it entirely.
//!
//! ## Stock Interceptors
//!
//! - [`MetricsInterceptor`] - invocation, failure and latency counters
//! - [`TracingInterceptor`] - a tracing span around every invocation

mod core;
mod metrics;
mod tracing;

pub use core::{from_fn, Interceptor, NamedInterceptor};
pub use metrics::MetricsInterceptor;
pub use tracing::TracingInterceptor;
