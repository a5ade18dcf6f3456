use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::action::{ActionTarget, HandlerFactory, Scope, Value};
use crate::error::DispatchError;
use crate::interceptor::NamedInterceptor;
use crate::result::ResultDescriptor;

/// A registered binding from a path pattern to a handler.
///
/// Cloning is shallow: every field is shared. Prototype-scoped resolutions
/// produce such a clone pointing at a fresh receiver.
#[derive(Clone)]
pub struct Route {
    pub(crate) path: Arc<str>,
    pub(crate) target: ActionTarget,
    pub(crate) interceptors: Arc<[NamedInterceptor]>,
    pub(crate) results: Arc<HashMap<String, ResultDescriptor>>,
    pub(crate) scope: Scope,
    pub(crate) properties: Arc<[(String, Value)]>,
}

impl Route {
    /// The pattern the route was registered under.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn target(&self) -> &ActionTarget {
        &self.target
    }

    /// The expanded, ordered interceptor chain.
    #[must_use]
    pub fn interceptors(&self) -> &[NamedInterceptor] {
        &self.interceptors
    }

    /// The result declared under `name`, if any.
    #[must_use]
    pub fn result(&self, name: &str) -> Option<&ResultDescriptor> {
        self.results.get(name)
    }

    #[must_use]
    pub fn results(&self) -> &HashMap<String, ResultDescriptor> {
        &self.results
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    /// Apply the route's scope for one resolution.
    ///
    /// Singleton routes are shared as they are. Prototype routes get a new
    /// receiver from `factory`, with the route's properties injected, wrapped in a
    /// shallow copy of the route.
    pub fn scoped(self: &Arc<Self>, factory: &dyn HandlerFactory) -> Result<Arc<Route>, DispatchError> {
        if self.scope == Scope::Singleton {
            return Ok(Arc::clone(self));
        }

        let type_name = factory.resolve_type(&self.target);
        let instantiation = |err: anyhow::Error| DispatchError::Instantiation {
            type_name: type_name.to_string(),
            source: err.into(),
        };
        let mut receiver = factory.new_instance(type_name).map_err(instantiation)?;
        for (name, value) in self.properties.iter() {
            receiver.inject(name, value).map_err(instantiation)?;
        }
        debug!(
            path = %self.path,
            handler_type = %type_name,
            properties = self.properties.len(),
            "Prototype handler instantiated"
        );

        Ok(Arc::new(Route {
            target: self.target.with_receiver(Arc::from(receiver)),
            ..Route::clone(self)
        }))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interceptors: Vec<&str> = self.interceptors.iter().map(NamedInterceptor::name).collect();
        f.debug_struct("Route")
            .field("path", &self.path)
            .field("target", &self.target)
            .field("interceptors", &interceptors)
            .field("results", &self.results)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Everything needed to register one route.
///
/// ```rust
/// use actionrouter::action::{ActionTarget, Scope};
/// use actionrouter::result::ResultDescriptor;
/// use actionrouter::router::RouteDefinition;
///
/// let target = ActionTarget::from_fn("orders#show", Vec::new(), |_| Ok(None));
/// let route = RouteDefinition::new("/orders/{id}", target)
///     .interceptor("auth")
///     .result(ResultDescriptor::new("ok", "view", "orders/show"))
///     .scope(Scope::Prototype);
/// assert_eq!(route.path, "/orders/{id}");
/// ```
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub path: String,
    pub target: ActionTarget,
    /// Interceptor or interceptor stack names, in chain order.
    pub interceptors: Vec<String>,
    pub results: Vec<ResultDescriptor>,
    pub scope: Scope,
    pub properties: Vec<(String, Value)>,
}

impl RouteDefinition {
    pub fn new(path: impl Into<String>, target: ActionTarget) -> Self {
        Self {
            path: path.into(),
            target,
            interceptors: Vec::new(),
            results: Vec::new(),
            scope: Scope::Singleton,
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn interceptor(mut self, name: impl Into<String>) -> Self {
        self.interceptors.push(name.into());
        self
    }

    #[must_use]
    pub fn interceptors<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interceptors.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn result(mut self, descriptor: ResultDescriptor) -> Self {
        self.results.push(descriptor);
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Declare a property injected into every receiver of this route.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.push((name.into(), value));
        self
    }
}
