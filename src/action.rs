//! # Action Module
//!
//! The value and callable model the dispatcher works with.
//!
//! - [`Value`] is a dynamically typed, cheaply clonable argument or result. The
//!   dispatcher never needs to know concrete types; it only compares them when
//!   binding parameters and looks for strings when resolving results.
//! - [`ParamType`] is a handler's declared formal parameter type.
//! - [`Invocable`] is "call this with these arguments". Closures implement it
//!   directly; stateful handlers implement it on their own type and may accept
//!   property injection through [`Invocable::inject`].
//! - [`ActionTarget`] binds an invocable receiver to its type name and declared
//!   parameters and carries the memoized binding plan.
//! - [`HandlerFactory`] produces fresh receivers for prototype-scoped routes;
//!   [`FactoryRegistry`] is the stock name-to-constructor implementation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::binder::BindingPlan;
use crate::error::{DispatchError, RegistrationKind};

/// A dynamically typed value passed to handlers or returned from them.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Value {
    /// Wrap any owned value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without copying it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Name of the concrete type, for diagnostics only.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn value_type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Shared handle to the inner value if it is a `T`.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// The value as text, if it is any of the string types.
    ///
    /// `String`, `&'static str` and `Arc<str>` all count as strings for result
    /// resolution.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        if let Some(s) = self.inner.downcast_ref::<String>() {
            return Some(s.as_str());
        }
        if let Some(s) = self.inner.downcast_ref::<&'static str>() {
            return Some(s);
        }
        self.inner.downcast_ref::<Arc<str>>().map(|s| s.as_ref())
    }

    /// Whether both values share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.inner).cast::<()>(),
            Arc::as_ptr(&other.inner).cast::<()>(),
        )
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Value({s:?})"),
            None => write!(f, "Value(<{}>)", self.type_name),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::new(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Value::new(value.to_string())
    }
}

/// A handler's declared formal parameter type.
#[derive(Clone)]
pub enum ParamType {
    /// Accepts any value.
    Any,
    /// Accepts values whose concrete type is exactly this one.
    Exact { type_id: TypeId, name: &'static str },
    /// Accepts values satisfying a predicate, e.g. "anything that is a number".
    Matching {
        name: &'static str,
        accepts: fn(&Value) -> bool,
    },
}

impl ParamType {
    #[must_use]
    pub fn of<T: Any>() -> Self {
        ParamType::Exact {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn matching(name: &'static str, accepts: fn(&Value) -> bool) -> Self {
        ParamType::Matching { name, accepts }
    }

    /// Whether `value` may be bound to a parameter of this type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Any => true,
            ParamType::Exact { type_id, .. } => value.value_type_id() == *type_id,
            ParamType::Matching { accepts, .. } => accepts(value),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Exact { name, .. } | ParamType::Matching { name, .. } => name,
        }
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamType({})", self.name())
    }
}

/// Something the dispatcher can call with bound arguments.
pub trait Invocable: Send + Sync {
    /// Run the handler. `args` has exactly one slot per declared parameter; a
    /// slot is `None` when no compatible value was available.
    fn invoke(&self, args: &[Option<Value>]) -> anyhow::Result<Option<Value>>;

    /// Receive a declared property before first use. Ignored by default.
    fn inject(&mut self, _name: &str, _value: &Value) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<F> Invocable for F
where
    F: Fn(&[Option<Value>]) -> anyhow::Result<Option<Value>> + Send + Sync,
{
    fn invoke(&self, args: &[Option<Value>]) -> anyhow::Result<Option<Value>> {
        self(args)
    }
}

/// Handler instancing policy of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One receiver shared by every call.
    #[default]
    Singleton,
    /// A fresh receiver for every resolution.
    Prototype,
}

/// A bound callable: receiver, type name and declared parameter types.
#[derive(Clone)]
pub struct ActionTarget {
    type_name: Arc<str>,
    receiver: Arc<dyn Invocable>,
    params: Arc<[ParamType]>,
    fixed_order: Option<bool>,
    plan: Arc<OnceLock<BindingPlan>>,
}

impl ActionTarget {
    pub fn new(
        type_name: impl Into<Arc<str>>,
        params: Vec<ParamType>,
        receiver: impl Invocable + 'static,
    ) -> Self {
        Self::from_arc(type_name, params, Arc::new(receiver))
    }

    /// Bind a closure; unlike [`ActionTarget::new`] the argument type is inferred.
    pub fn from_fn<F>(type_name: impl Into<Arc<str>>, params: Vec<ParamType>, f: F) -> Self
    where
        F: Fn(&[Option<Value>]) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        Self::from_arc(type_name, params, Arc::new(f))
    }

    pub fn from_arc(
        type_name: impl Into<Arc<str>>,
        params: Vec<ParamType>,
        receiver: Arc<dyn Invocable>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            receiver,
            params: params.into(),
            fixed_order: None,
            plan: Arc::new(OnceLock::new()),
        }
    }

    /// Override the dispatcher-wide fixed-order binding flag for this handler.
    ///
    /// Handlers whose supplementary argument types vary between calls must pass
    /// `false` here when fixed-order binding is enabled globally.
    #[must_use]
    pub fn fixed_order(mut self, enabled: bool) -> Self {
        self.fixed_order = Some(enabled);
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    #[must_use]
    pub fn receiver(&self) -> &Arc<dyn Invocable> {
        &self.receiver
    }

    #[must_use]
    pub fn fixed_order_override(&self) -> Option<bool> {
        self.fixed_order
    }

    pub(crate) fn binding_plan(&self) -> &OnceLock<BindingPlan> {
        &self.plan
    }

    /// Same handler, different receiver. The binding plan stays shared since it
    /// belongs to the handler, not to the instance.
    pub(crate) fn with_receiver(&self, receiver: Arc<dyn Invocable>) -> Self {
        Self {
            type_name: Arc::clone(&self.type_name),
            receiver,
            params: Arc::clone(&self.params),
            fixed_order: self.fixed_order,
            plan: Arc::clone(&self.plan),
        }
    }

    /// Inject properties into the receiver if nothing else holds it.
    ///
    /// Returns `false` when the receiver is shared and could not be mutated.
    pub(crate) fn inject_properties(
        &mut self,
        properties: &[(String, Value)],
    ) -> anyhow::Result<bool> {
        if properties.is_empty() {
            return Ok(true);
        }
        let Some(receiver) = Arc::get_mut(&mut self.receiver) else {
            return Ok(false);
        };
        for (name, value) in properties {
            receiver.inject(name, value)?;
        }
        Ok(true)
    }

    /// Call the receiver, attributing any failure to this target.
    pub fn invoke(&self, args: &[Option<Value>]) -> Result<Option<Value>, DispatchError> {
        self.receiver
            .invoke(args)
            .map_err(|err| DispatchError::invocation(self.type_name.as_ref(), err))
    }
}

impl fmt::Debug for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTarget")
            .field("type_name", &self.type_name)
            .field("params", &self.params)
            .field("fixed_order", &self.fixed_order)
            .finish_non_exhaustive()
    }
}

/// Produces handler receivers for prototype-scoped routes.
pub trait HandlerFactory: Send + Sync {
    /// Create a fresh, not yet injected receiver of the named type.
    fn new_instance(&self, type_name: &str) -> anyhow::Result<Box<dyn Invocable>>;

    /// The type name a target's receiver was created from.
    fn resolve_type<'a>(&self, target: &'a ActionTarget) -> &'a str {
        target.type_name()
    }
}

type Constructor = Arc<dyn Fn() -> anyhow::Result<Box<dyn Invocable>> + Send + Sync>;

/// Name-to-constructor handler factory.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    constructors: HashMap<String, Constructor>,
}

impl FactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for a handler type.
    pub fn register<F>(&mut self, type_name: &str, constructor: F) -> Result<(), DispatchError>
    where
        F: Fn() -> anyhow::Result<Box<dyn Invocable>> + Send + Sync + 'static,
    {
        if self.constructors.contains_key(type_name) {
            return Err(DispatchError::DuplicateRegistration {
                kind: RegistrationKind::HandlerType,
                name: type_name.to_string(),
            });
        }
        self.constructors
            .insert(type_name.to_string(), Arc::new(constructor));
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }
}

impl HandlerFactory for FactoryRegistry {
    fn new_instance(&self, type_name: &str) -> anyhow::Result<Box<dyn Invocable>> {
        match self.constructors.get(type_name) {
            Some(constructor) => constructor(),
            None => anyhow::bail!("no constructor registered for handler type '{type_name}'"),
        }
    }
}
