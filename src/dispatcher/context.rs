use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::action::Value;
use crate::binder::ConverterFactory;
use crate::error::DispatchError;
use crate::interceptor::NamedInterceptor;
use crate::result::ResultDescriptor;
use crate::router::{Captures, Route};

/// Per-call state driven through the interceptor chain.
///
/// A context is created for every `invoke_action` call and never shared. Each
/// [`invoke`](InvocationContext::invoke) hands control to the next interceptor;
/// once the chain is exhausted the handler runs, exactly once.
pub struct InvocationContext {
    path: String,
    route: Arc<Route>,
    captures: Arc<Captures>,
    interceptors: Arc<[NamedInterceptor]>,
    cursor: usize,
    original_args: Vec<Value>,
    supplementary_args: Vec<Value>,
    executed: bool,
    result: Option<Value>,
    result_descriptor: Option<ResultDescriptor>,
    converters: Arc<dyn ConverterFactory>,
}

impl InvocationContext {
    /// The captures are always offered to the handler as the first
    /// supplementary value, so handlers may declare a [`Captures`] parameter.
    pub(crate) fn new(
        path: &str,
        route: Arc<Route>,
        captures: Arc<Captures>,
        args: Vec<Value>,
        converters: Arc<dyn ConverterFactory>,
    ) -> Self {
        let interceptors = Arc::clone(&route.interceptors);
        let supplementary_args = vec![Value::from_arc(Arc::clone(&captures))];
        Self {
            path: path.to_string(),
            route,
            captures,
            interceptors,
            cursor: 0,
            original_args: args,
            supplementary_args,
            executed: false,
            result: None,
            result_descriptor: None,
            converters,
        }
    }

    /// Continue the chain: run the next interceptor, or the handler when none
    /// is left.
    pub fn invoke(&mut self) -> Result<Option<Value>, DispatchError> {
        if self.executed {
            return Err(self.already_executed());
        }
        let interceptors = Arc::clone(&self.interceptors);
        match interceptors.get(self.cursor) {
            Some(interceptor) => {
                self.cursor += 1;
                trace!(path = %self.path, interceptor = %interceptor.name(), "Entering interceptor");
                interceptor.intercept(self)
            }
            None => self.execute(),
        }
    }

    /// Replace the original arguments, then continue the chain.
    pub fn invoke_with(&mut self, args: Vec<Value>) -> Result<Option<Value>, DispatchError> {
        self.original_args = args;
        self.invoke()
    }

    /// Run the handler now, skipping whatever is left of the chain.
    pub fn invoke_action_only(&mut self) -> Result<Option<Value>, DispatchError> {
        if self.executed {
            return Err(self.already_executed());
        }
        self.cursor = self.interceptors.len();
        self.execute()
    }

    /// Replace the original arguments, then run the handler, skipping whatever
    /// is left of the chain.
    pub fn invoke_action_only_with(&mut self, args: Vec<Value>) -> Result<Option<Value>, DispatchError> {
        if self.executed {
            return Err(self.already_executed());
        }
        self.original_args = args;
        self.invoke_action_only()
    }

    fn execute(&mut self) -> Result<Option<Value>, DispatchError> {
        self.executed = true;
        let converter = self.converters.converter(self);
        let target = self.route.target();
        let args = converter.convert(target, &self.original_args, &self.supplementary_args);
        trace!(path = %self.path, handler = %target.type_name(), args = args.len(), "Executing handler");
        let result = target.invoke(&args)?;
        self.result.clone_from(&result);
        Ok(result)
    }

    fn already_executed(&self) -> DispatchError {
        DispatchError::AlreadyExecuted {
            path: self.path.clone(),
        }
    }

    /// The path as the caller passed it.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    #[must_use]
    pub fn captures(&self) -> &Captures {
        &self.captures
    }

    /// A captured wildcard value, by position (`*`, `*2`, ...) or name.
    #[must_use]
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.captures.get(name)
    }

    #[must_use]
    pub fn original_args(&self) -> &[Value] {
        &self.original_args
    }

    #[must_use]
    pub fn supplementary_args(&self) -> &[Value] {
        &self.supplementary_args
    }

    /// Offer another value to the handler's parameter binding.
    pub fn add_supplementary(&mut self, value: Value) {
        self.supplementary_args.push(value);
    }

    /// Number of interceptors not yet entered.
    #[must_use]
    pub fn remaining_interceptors(&self) -> usize {
        self.interceptors.len().saturating_sub(self.cursor)
    }

    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// What the handler returned, once it ran.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The descriptor currently being rendered.
    #[must_use]
    pub fn result_descriptor(&self) -> Option<&ResultDescriptor> {
        self.result_descriptor.as_ref()
    }

    pub(crate) fn set_result_descriptor(&mut self, descriptor: ResultDescriptor) {
        self.result_descriptor = Some(descriptor);
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("path", &self.path)
            .field("route", &self.route.path())
            .field("cursor", &self.cursor)
            .field("executed", &self.executed)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}
