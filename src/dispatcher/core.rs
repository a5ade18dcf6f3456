use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::context::InvocationContext;
use crate::action::{FactoryRegistry, HandlerFactory, Scope, Value};
use crate::binder::{ConverterFactory, DefaultConverterFactory};
use crate::error::{DispatchError, RegistrationKind};
use crate::interceptor::{Interceptor, NamedInterceptor};
use crate::result::{GlobalResult, LoggingFallback, ResultDescriptor, ResultFallback, ResultResolver, ResultType};
use crate::router::{CacheEntry, Route, RouteDefinition, RouteTable};
use crate::runtime_config::DispatcherConfig;

/// Registry of routes, interceptors and result types plus the call surface.
///
/// Register everything through `&mut self` during startup, then share the
/// dispatcher (e.g. in an `Arc`) and call [`Dispatcher::invoke_action`] from
/// any number of threads.
pub struct Dispatcher {
    config: DispatcherConfig,
    table: RouteTable,
    interceptors: HashMap<String, NamedInterceptor>,
    stacks: HashMap<String, Arc<[NamedInterceptor]>>,
    result_types: HashMap<String, Arc<dyn ResultType>>,
    global_results: HashMap<String, GlobalResult>,
    factory: Arc<dyn HandlerFactory>,
    converters: Arc<dyn ConverterFactory>,
    fallback: Arc<dyn ResultFallback>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::build(DispatcherConfig::default())
    }
}

impl Dispatcher {
    /// Create a dispatcher from a validated configuration.
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatchError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: DispatcherConfig) -> Self {
        let table = RouteTable::new(config.separator, config.suffix_rule(), config.cache_size);
        let converters = Arc::new(DefaultConverterFactory::new(config.fixed_order));
        Self {
            table,
            interceptors: HashMap::new(),
            stacks: HashMap::new(),
            result_types: HashMap::new(),
            global_results: HashMap::new(),
            factory: Arc::new(FactoryRegistry::new()),
            converters,
            fallback: Arc::new(LoggingFallback),
            config,
        }
    }

    /// Use `factory` to create receivers for prototype-scoped routes.
    #[must_use]
    pub fn with_handler_factory(mut self, factory: Arc<dyn HandlerFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Replace the parameter binding policy.
    #[must_use]
    pub fn with_converter_factory(mut self, converters: Arc<dyn ConverterFactory>) -> Self {
        self.converters = converters;
        self
    }

    /// Replace the hooks for unmapped results.
    #[must_use]
    pub fn with_result_fallback(mut self, fallback: Arc<dyn ResultFallback>) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    #[must_use]
    pub fn route_table(&self) -> &RouteTable {
        &self.table
    }

    fn ensure_unused_interceptor_name(&self, name: &str, kind: RegistrationKind) -> Result<(), DispatchError> {
        if self.interceptors.contains_key(name) || self.stacks.contains_key(name) {
            return Err(DispatchError::DuplicateRegistration {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Register an interceptor. Interceptors and stacks share one namespace.
    pub fn add_interceptor(&mut self, name: &str, interceptor: Arc<dyn Interceptor>) -> Result<(), DispatchError> {
        self.ensure_unused_interceptor_name(name, RegistrationKind::Interceptor)?;
        self.interceptors
            .insert(name.to_string(), NamedInterceptor::new(name, interceptor));
        info!(
            interceptor = %name,
            total_interceptors = self.interceptors.len(),
            "Interceptor registered"
        );
        Ok(())
    }

    /// Register a named, ordered group of interceptors and stacks.
    ///
    /// Members must already be registered; nested stacks are flattened here.
    pub fn add_interceptor_stack<I, S>(&mut self, name: &str, members: I) -> Result<(), DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_unused_interceptor_name(name, RegistrationKind::InterceptorStack)?;
        let mut chain = Vec::new();
        for member in members {
            self.expand_into(member.as_ref(), &mut chain)?;
        }
        info!(stack = %name, interceptors = chain.len(), "Interceptor stack registered");
        self.stacks.insert(name.to_string(), chain.into());
        Ok(())
    }

    fn expand_into(&self, name: &str, chain: &mut Vec<NamedInterceptor>) -> Result<(), DispatchError> {
        if let Some(interceptor) = self.interceptors.get(name) {
            chain.push(interceptor.clone());
        } else if let Some(stack) = self.stacks.get(name) {
            chain.extend(stack.iter().cloned());
        } else {
            return Err(DispatchError::MissingInterceptor {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn interceptor_chain(&self, definition: &RouteDefinition) -> Result<Vec<NamedInterceptor>, DispatchError> {
        let mut chain = Vec::new();
        if !definition.interceptors.is_empty() {
            for name in &definition.interceptors {
                self.expand_into(name, &mut chain)?;
            }
            return Ok(chain);
        }
        if let Some(default_stack) = &self.config.default_stack {
            if self.stacks.contains_key(default_stack) || self.interceptors.contains_key(default_stack) {
                self.expand_into(default_stack, &mut chain)?;
            } else {
                warn!(
                    path = %definition.path,
                    stack = %default_stack,
                    "Default interceptor stack is not registered; route has no interceptors"
                );
            }
        }
        Ok(chain)
    }

    /// Register a route.
    ///
    /// Interceptor names are expanded now, so interceptors and stacks must be
    /// registered first. Singleton properties are injected here, once.
    pub fn add_route(&mut self, definition: RouteDefinition) -> Result<Arc<Route>, DispatchError> {
        let chain = self.interceptor_chain(&definition)?;

        let mut results = HashMap::with_capacity(definition.results.len());
        for descriptor in definition.results {
            if results.contains_key(&descriptor.name) {
                return Err(DispatchError::DuplicateRegistration {
                    kind: RegistrationKind::RouteResult,
                    name: format!("{}#{}", definition.path, descriptor.name),
                });
            }
            results.insert(descriptor.name.clone(), descriptor);
        }

        let mut target = definition.target;
        if definition.scope == Scope::Singleton {
            let injected = target
                .inject_properties(&definition.properties)
                .map_err(|err| DispatchError::Instantiation {
                    type_name: target.type_name().to_string(),
                    source: err.into(),
                })?;
            if !injected {
                warn!(
                    path = %definition.path,
                    handler = %target.type_name(),
                    "Handler is shared elsewhere; properties were not injected"
                );
            }
        }

        let route = self.table.insert(Route {
            path: Arc::from(definition.path),
            target,
            interceptors: chain.into(),
            results: Arc::new(results),
            scope: definition.scope,
            properties: definition.properties.into(),
        })?;
        info!(
            path = %route.path(),
            handler = %route.target().type_name(),
            scope = ?route.scope(),
            interceptors = route.interceptors().len(),
            total_routes = self.table.len(),
            "Route registered"
        );
        Ok(route)
    }

    /// Register a result-type handler.
    pub fn add_result_type(&mut self, name: &str, handler: Arc<dyn ResultType>) -> Result<(), DispatchError> {
        if self.result_types.contains_key(name) {
            return Err(DispatchError::DuplicateRegistration {
                kind: RegistrationKind::ResultType,
                name: name.to_string(),
            });
        }
        self.result_types.insert(name.to_string(), handler);
        info!(result_type = %name, "Result type registered");
        Ok(())
    }

    /// Register a result every route can return by name.
    pub fn add_global_result(
        &mut self,
        descriptor: ResultDescriptor,
        handler: Arc<dyn ResultType>,
    ) -> Result<(), DispatchError> {
        if self.global_results.contains_key(&descriptor.name) {
            return Err(DispatchError::DuplicateRegistration {
                kind: RegistrationKind::GlobalResult,
                name: descriptor.name,
            });
        }
        info!(result = %descriptor.name, kind = %descriptor.kind, "Global result registered");
        self.global_results
            .insert(descriptor.name.clone(), GlobalResult { descriptor, handler });
        Ok(())
    }

    /// Look up a global result by name.
    pub fn global_result(&self, name: &str) -> Result<&GlobalResult, DispatchError> {
        self.global_results
            .get(name)
            .ok_or_else(|| DispatchError::MissingGlobalResult {
                name: name.to_string(),
            })
    }

    /// Resolve `path` to its registered route and captures.
    pub fn resolve(&self, path: &str) -> Result<CacheEntry, DispatchError> {
        self.table.resolve(path)
    }

    /// Build the per-call context for `path`, applying the route's scope.
    ///
    /// [`Dispatcher::invoke_action`] is this plus `invoke()` plus result
    /// resolution; use it directly to drive a context by hand.
    pub fn context(&self, path: &str, args: Vec<Value>) -> Result<InvocationContext, DispatchError> {
        let entry = self.table.resolve(path)?;
        let route = entry.route.scoped(self.factory.as_ref())?;
        Ok(InvocationContext::new(
            path,
            route,
            entry.captures,
            args,
            Arc::clone(&self.converters),
        ))
    }

    /// Invoke the action at `path` through its interceptor chain and resolve
    /// the result.
    pub fn invoke_action(&self, path: &str, args: Vec<Value>) -> Result<Option<Value>, DispatchError> {
        let mut ctx = self.context(path, args)?;
        let returned = ctx.invoke().inspect_err(|err| log_failure(path, err))?;
        self.resolve_result(&mut ctx, returned)
    }

    /// Like [`Dispatcher::invoke_action`], skipping the interceptor chain.
    pub fn invoke_action_only(&self, path: &str, args: Vec<Value>) -> Result<Option<Value>, DispatchError> {
        let mut ctx = self.context(path, args)?;
        let returned = ctx.invoke_action_only().inspect_err(|err| log_failure(path, err))?;
        self.resolve_result(&mut ctx, returned)
    }

    /// Run the result protocol on a value the chain returned for `ctx`.
    pub fn resolve_result(
        &self,
        ctx: &mut InvocationContext,
        returned: Option<Value>,
    ) -> Result<Option<Value>, DispatchError> {
        let resolver = ResultResolver {
            result_types: &self.result_types,
            global_results: &self.global_results,
            default_kind: &self.config.default_result_type,
            default_location: &self.config.default_result_location,
            fallback: self.fallback.as_ref(),
        };
        resolver
            .resolve(ctx, returned)
            .inspect_err(|err| log_failure(ctx.path(), err))
    }

    /// Forget every cached resolution.
    pub fn clear_cache(&self) {
        self.table.clear_cache();
        debug!("Route resolution cache cleared");
    }

    /// Remove every route. Interceptors and result types stay registered.
    pub fn clear_routes(&mut self) {
        self.table.clear();
    }
}

fn log_failure(path: &str, err: &DispatchError) {
    match err.target() {
        Some(target) => error!(path = %path, failed_at = %target, error = %err, "Action invocation failed"),
        None => error!(path = %path, error = %err, "Action invocation failed"),
    }
}
