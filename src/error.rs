//! # Error Module
//!
//! Every failure the dispatcher core can raise is a [`DispatchError`]. Application
//! callables (handlers, interceptors, result types, factories) report failures as
//! [`anyhow::Error`]; those are folded back into a `DispatchError` at the point where
//! the core called them.
//!
//! ## Unwrapping
//!
//! An interceptor that propagates the error of its nested `invoke()` call with `?`
//! hands the core an `anyhow::Error` that already wraps a `DispatchError`. Wrapping
//! it again would bury the root cause under one layer per interceptor, so
//! [`DispatchError::invocation`] downcasts first and only wraps foreign errors.
//! The caller of `invoke_action` always sees the innermost cause together with the
//! target at which it was raised.

use std::fmt;

use thiserror::Error;

use crate::result::ResultDescriptor;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The registry a duplicate registration collided in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    Route,
    Interceptor,
    InterceptorStack,
    RouteResult,
    ResultType,
    GlobalResult,
    HandlerType,
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RegistrationKind::Route => "route",
            RegistrationKind::Interceptor => "interceptor",
            RegistrationKind::InterceptorStack => "interceptor stack",
            RegistrationKind::RouteResult => "route result",
            RegistrationKind::ResultType => "result type",
            RegistrationKind::GlobalResult => "global result",
            RegistrationKind::HandlerType => "handler type",
        };
        f.write_str(label)
    }
}

/// Errors raised by route registration, resolution and invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route matches the (suffix-stripped) path.
    #[error("no route matches path '{path}'")]
    RouteNotFound { path: String },

    /// A path or name was registered twice.
    #[error("duplicate {kind} registration: '{name}'")]
    DuplicateRegistration { kind: RegistrationKind, name: String },

    /// `invoke()` was called on a context whose handler already ran.
    #[error("action '{path}' has already been executed")]
    AlreadyExecuted { path: String },

    /// No result-type handler is registered for the descriptor's type.
    #[error("no result type registered for {descriptor}")]
    MissingResultType { descriptor: ResultDescriptor },

    /// No global result is registered under the name.
    #[error("no global result named '{name}'")]
    MissingGlobalResult { name: String },

    /// A route or stack referenced an interceptor name that is not registered.
    #[error("interceptor or interceptor stack '{name}' is not registered")]
    MissingInterceptor { name: String },

    /// The path is deeper than the trie's match code can encode.
    #[error("path '{path}' has {depth} segments; at most {max} are supported")]
    DepthOverflow {
        path: String,
        depth: usize,
        max: usize,
    },

    /// A prototype-scoped handler could not be created or injected.
    #[error("failed to instantiate handler type '{type_name}': {source}")]
    Instantiation {
        type_name: String,
        #[source]
        source: BoxError,
    },

    /// The dispatcher configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A handler, interceptor or result type failed.
    #[error("{target} failed: {source}")]
    Invocation {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl DispatchError {
    /// Fold an application error raised at `target` into a `DispatchError`.
    ///
    /// Errors that already are a `DispatchError` pass through untouched, so nested
    /// interceptors never stack wrapper upon wrapper.
    pub fn invocation(target: impl Into<String>, err: anyhow::Error) -> Self {
        match err.downcast::<DispatchError>() {
            Ok(inner) => inner,
            Err(err) => DispatchError::Invocation {
                target: target.into(),
                source: err.into(),
            },
        }
    }

    /// The target an invocation failure originated at, if this is one.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            DispatchError::Invocation { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Whether this error is a registration-time failure.
    #[must_use]
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            DispatchError::DuplicateRegistration { .. }
                | DispatchError::MissingInterceptor { .. }
                | DispatchError::DepthOverflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_wraps_foreign_errors_once() {
        let err = DispatchError::invocation("orders#list", anyhow::anyhow!("db down"));
        assert_eq!(err.target(), Some("orders#list"));
        assert_eq!(err.to_string(), "orders#list failed: db down");
    }

    #[test]
    fn invocation_unwraps_nested_dispatch_errors() {
        let inner = DispatchError::invocation("handler", anyhow::anyhow!("boom"));
        let outer = DispatchError::invocation("auth", anyhow::Error::new(inner));
        let outermost = DispatchError::invocation("audit", anyhow::Error::new(outer));
        assert_eq!(outermost.target(), Some("handler"));
        assert_eq!(outermost.to_string(), "handler failed: boom");
    }

    #[test]
    fn invocation_keeps_core_errors_unchanged() {
        let err = DispatchError::AlreadyExecuted {
            path: "/a".to_string(),
        };
        let err = DispatchError::invocation("timer", anyhow::Error::new(err));
        assert!(matches!(err, DispatchError::AlreadyExecuted { .. }));
    }

    #[test]
    fn config_errors_are_not_registration_errors() {
        assert!(!DispatchError::Config("bad separator".to_string()).is_registration());
        assert!(DispatchError::MissingInterceptor {
            name: "auth".to_string()
        }
        .is_registration());
    }

    #[test]
    fn invocation_sees_through_context_layers() {
        let inner = DispatchError::RouteNotFound {
            path: "/x".to_string(),
        };
        let err = anyhow::Error::new(inner).context("while forwarding");
        let err = DispatchError::invocation("forward", err);
        assert!(matches!(err, DispatchError::RouteNotFound { .. }));
    }
}
