use std::fmt;
use std::sync::Arc;

use crate::action::Value;
use crate::dispatcher::InvocationContext;
use crate::error::DispatchError;

/// Code run around the rest of the chain.
///
/// Call `ctx.invoke()` to continue; its return value is the result of
/// everything further down. Not calling it short-circuits the chain and the
/// interceptor's own return value becomes the action's result.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, ctx: &mut InvocationContext) -> anyhow::Result<Option<Value>>;
}

impl<F> Interceptor for F
where
    F: Fn(&mut InvocationContext) -> anyhow::Result<Option<Value>> + Send + Sync,
{
    fn intercept(&self, ctx: &mut InvocationContext) -> anyhow::Result<Option<Value>> {
        self(ctx)
    }
}

/// Wrap a closure, letting the compiler infer its signature.
///
/// ```rust
/// use actionrouter::interceptor;
///
/// let auth = interceptor::from_fn(|ctx| {
///     if ctx.capture("user").is_none() {
///         return Ok(Some("login".into()));
///     }
///     Ok(ctx.invoke()?)
/// });
/// # let _ = auth;
/// ```
pub fn from_fn<F>(f: F) -> Arc<dyn Interceptor>
where
    F: Fn(&mut InvocationContext) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An interceptor together with the name it was registered under.
#[derive(Clone)]
pub struct NamedInterceptor {
    name: Arc<str>,
    inner: Arc<dyn Interceptor>,
}

impl NamedInterceptor {
    pub fn new(name: impl Into<Arc<str>>, inner: Arc<dyn Interceptor>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.inner
    }

    pub(crate) fn intercept(&self, ctx: &mut InvocationContext) -> Result<Option<Value>, DispatchError> {
        self.inner
            .intercept(ctx)
            .map_err(|err| DispatchError::invocation(format!("interceptor '{}'", self.name), err))
    }
}

impl fmt::Debug for NamedInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedInterceptor").field(&self.name).finish()
    }
}
