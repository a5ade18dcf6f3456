//! # Result Resolution
//!
//! Turns the value returned by the top of the interceptor chain into the
//! action's final result.
//!
//! Non-string returns go to the [`ResultFallback::object_result`] hook. A string
//! `s` is tried, in order, as:
//!
//! 1. the name of a result declared on the route,
//! 2. a `type:location` pair, when the route declares the wildcard result `*`
//!    or `s` contains a colon,
//! 3. the name of a global result,
//!
//! and otherwise goes to [`ResultFallback::undefined_result`].
//!
//! Resolving a descriptor means looking up the [`ResultType`] registered for its
//! type (the configured default type when the descriptor has none), recording
//! the descriptor on the context and running the handler. A non-`None` value
//! returned by a handler replaces the final result.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::action::Value;
use crate::dispatcher::InvocationContext;
use crate::error::DispatchError;

/// Name of the catch-all route result.
pub const WILDCARD_RESULT: &str = "*";

/// A named result: which result type renders it and where to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultDescriptor {
    pub name: String,
    /// Result type name; empty means the configured default.
    pub kind: String,
    pub location: String,
}

impl ResultDescriptor {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            location: location.into(),
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD_RESULT
    }
}

impl fmt::Display for ResultDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "result '{}' (type '{}', location '{}')",
            self.name, self.kind, self.location
        )
    }
}

/// Renders a resolved result.
pub trait ResultType: Send + Sync {
    /// Whether [`ResultType::render`] wants the invocation context.
    fn needs_context(&self) -> bool {
        true
    }

    /// Render the result. The descriptor being rendered is available through
    /// [`InvocationContext::result_descriptor`].
    fn render(&self, ctx: Option<&InvocationContext>) -> anyhow::Result<Option<Value>>;
}

impl<F> ResultType for F
where
    F: Fn(Option<&InvocationContext>) -> anyhow::Result<Option<Value>> + Send + Sync,
{
    fn render(&self, ctx: Option<&InvocationContext>) -> anyhow::Result<Option<Value>> {
        self(ctx)
    }
}

/// Wrap a closure that renders with the context.
pub fn from_fn<F>(f: F) -> Arc<dyn ResultType>
where
    F: Fn(Option<&InvocationContext>) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure that renders without the context.
pub fn standalone<F>(f: F) -> Arc<dyn ResultType>
where
    F: Fn() -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
{
    Arc::new(Standalone(f))
}

struct Standalone<F>(F);

impl<F> ResultType for Standalone<F>
where
    F: Fn() -> anyhow::Result<Option<Value>> + Send + Sync,
{
    fn needs_context(&self) -> bool {
        false
    }

    fn render(&self, _ctx: Option<&InvocationContext>) -> anyhow::Result<Option<Value>> {
        (self.0)()
    }
}

/// A result available to every route by name.
#[derive(Clone)]
pub struct GlobalResult {
    pub descriptor: ResultDescriptor,
    pub handler: Arc<dyn ResultType>,
}

impl fmt::Debug for GlobalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalResult")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Hooks for results the protocol does not map.
pub trait ResultFallback: Send + Sync {
    /// A non-string result. Returned unchanged by default.
    fn object_result(&self, ctx: &InvocationContext, result: Value) -> anyhow::Result<Option<Value>> {
        debug!(path = %ctx.path(), value_type = result.type_name(), "Passing through object result");
        Ok(Some(result))
    }

    /// A string matching no route, wildcard or global result. Returned unchanged
    /// by default.
    fn undefined_result(
        &self,
        ctx: &InvocationContext,
        name: &str,
        result: Value,
    ) -> anyhow::Result<Option<Value>> {
        warn!(path = %ctx.path(), result = %name, "Result is not defined for this action");
        Ok(Some(result))
    }
}

/// The default hooks: log and pass the result through.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFallback;

impl ResultFallback for LoggingFallback {}

/// Split `input` into `(type, location)` at its first colon, trimming both
/// halves. Without a colon the whole trimmed input is the location. Empty halves
/// take the fallbacks.
///
/// ```rust
/// use actionrouter::result::parse_type_location;
///
/// assert_eq!(parse_type_location("  abc    :   123 ", "d1", "d2"), ("abc".into(), "123".into()));
/// assert_eq!(parse_type_location(":", "d1", "d2"), ("d1".into(), "d2".into()));
/// assert_eq!(parse_type_location("page", "d1", "d2"), ("d1".into(), "page".into()));
/// ```
#[must_use]
pub fn parse_type_location(input: &str, fallback_kind: &str, fallback_location: &str) -> (String, String) {
    let input = input.trim();
    let (kind, location) = match input.split_once(':') {
        Some((kind, location)) => (kind.trim(), location.trim()),
        None => ("", input),
    };
    let kind = if kind.is_empty() { fallback_kind } else { kind };
    let location = if location.is_empty() {
        fallback_location
    } else {
        location
    };
    (kind.to_string(), location.to_string())
}

/// The registries and defaults one resolution runs against.
pub(crate) struct ResultResolver<'a> {
    pub(crate) result_types: &'a HashMap<String, Arc<dyn ResultType>>,
    pub(crate) global_results: &'a HashMap<String, GlobalResult>,
    pub(crate) default_kind: &'a str,
    pub(crate) default_location: &'a str,
    pub(crate) fallback: &'a dyn ResultFallback,
}

impl ResultResolver<'_> {
    /// Run the protocol on `returned`, the value the chain produced.
    pub(crate) fn resolve(
        &self,
        ctx: &mut InvocationContext,
        returned: Option<Value>,
    ) -> Result<Option<Value>, DispatchError> {
        let Some(value) = returned else {
            return Ok(None);
        };
        let Some(name) = value.as_str().map(str::to_owned) else {
            return self
                .fallback
                .object_result(ctx, value)
                .map_err(|err| DispatchError::invocation("object result hook", err));
        };

        if let Some(descriptor) = ctx.route().result(&name).cloned() {
            debug!(path = %ctx.path(), result = %name, "Resolving declared result");
            return self.render(ctx, descriptor, Some(value));
        }

        let wildcard = ctx.route().result(WILDCARD_RESULT).cloned();
        if wildcard.is_some() || name.contains(':') {
            let (fallback_kind, fallback_location) = match &wildcard {
                Some(wildcard) => (wildcard.kind.as_str(), wildcard.location.as_str()),
                None => (self.default_kind, self.default_location),
            };
            let (kind, location) = parse_type_location(&name, fallback_kind, fallback_location);
            debug!(path = %ctx.path(), result = %name, kind = %kind, location = %location, "Resolving ad-hoc result");
            let descriptor = ResultDescriptor {
                name,
                kind,
                location,
            };
            return self.render(ctx, descriptor, Some(value));
        }

        if let Some(global) = self.global_results.get(&name) {
            debug!(path = %ctx.path(), result = %name, "Resolving global result");
            return self.render_global(ctx, global, Some(value));
        }

        self.fallback
            .undefined_result(ctx, &name, value)
            .map_err(|err| DispatchError::invocation("undefined result hook", err))
    }

    /// Render `descriptor`; `current` is kept unless the result type returns a value.
    pub(crate) fn render(
        &self,
        ctx: &mut InvocationContext,
        mut descriptor: ResultDescriptor,
        current: Option<Value>,
    ) -> Result<Option<Value>, DispatchError> {
        if descriptor.kind.is_empty() {
            descriptor.kind = self.default_kind.to_string();
        }
        let Some(handler) = self.result_types.get(&descriptor.kind) else {
            return Err(DispatchError::MissingResultType { descriptor });
        };
        let target = format!("result type '{}'", descriptor.kind);
        ctx.set_result_descriptor(descriptor);
        let rendered = invoke(handler.as_ref(), ctx).map_err(|err| DispatchError::invocation(target, err))?;
        Ok(rendered.or(current))
    }

    /// Run a global result's handler, then its result type when it names one.
    pub(crate) fn render_global(
        &self,
        ctx: &mut InvocationContext,
        global: &GlobalResult,
        current: Option<Value>,
    ) -> Result<Option<Value>, DispatchError> {
        ctx.set_result_descriptor(global.descriptor.clone());
        let mut result = invoke(global.handler.as_ref(), ctx)
            .map_err(|err| {
                DispatchError::invocation(format!("global result '{}'", global.descriptor.name), err)
            })?
            .or(current);
        if !global.descriptor.kind.is_empty() {
            result = self.render(ctx, global.descriptor.clone(), result)?;
        }
        Ok(result)
    }
}

fn invoke(handler: &dyn ResultType, ctx: &InvocationContext) -> anyhow::Result<Option<Value>> {
    if handler.needs_context() {
        handler.render(Some(ctx))
    } else {
        handler.render(None)
    }
}
