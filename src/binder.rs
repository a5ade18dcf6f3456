//! # Parameter Binding
//!
//! Computes a handler's call arguments from whatever values happen to be
//! available for a call: the caller's original arguments followed by the
//! supplementary values interceptors and the dispatcher contributed.
//!
//! ## Algorithm
//!
//! For each declared parameter, in declaration order, the first not yet
//! consumed available value whose type the parameter accepts is bound and
//! consumed. A parameter with no remaining compatible value binds to `None`.
//! Matching is positional and greedy: an earlier parameter wins a value even
//! when a later parameter would be a more specific fit.
//!
//! A trailing `Vec<Value>` parameter is an ordinary typed slot; there is no
//! variadic pad/splice mode.
//!
//! ## Fixed-order plans
//!
//! With fixed-order binding enabled the slot mapping computed on a handler's
//! first call is memoized on the handler and reused verbatim. That is only
//! valid while the *types* in each available slot stay stable for that
//! handler; handlers that see varying supplementary types must opt out with
//! [`ActionTarget::fixed_order`](crate::action::ActionTarget::fixed_order).

use std::sync::Arc;

use smallvec::{smallvec, SmallVec};
use tracing::trace;

use crate::action::{ActionTarget, ParamType, Value};
use crate::dispatcher::InvocationContext;

/// Inline capacity for per-call binding scratch space.
const INLINE_ARGS: usize = 8;

/// Parameter index to available-slot mapping for one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    slots: Box<[Option<usize>]>,
}

impl BindingPlan {
    /// Compute the greedy left-to-right mapping of `params` onto `available`.
    #[must_use]
    pub fn compute(params: &[ParamType], available: &[&Value]) -> Self {
        let mut consumed: SmallVec<[bool; INLINE_ARGS]> = smallvec![false; available.len()];
        let slots = params
            .iter()
            .map(|param| {
                let slot = available
                    .iter()
                    .enumerate()
                    .find(|(index, value)| !consumed[*index] && param.accepts(value))
                    .map(|(index, _)| index)?;
                consumed[slot] = true;
                Some(slot)
            })
            .collect();
        Self { slots }
    }

    /// Materialize the arguments. Slots past the end of `available` bind to `None`.
    #[must_use]
    pub fn apply(&self, available: &[&Value]) -> Vec<Option<Value>> {
        self.slots
            .iter()
            .map(|slot| slot.and_then(|index| available.get(index)).map(|v| (*v).clone()))
            .collect()
    }

    #[must_use]
    pub fn slots(&self) -> &[Option<usize>] {
        &self.slots
    }
}

/// Bind `params` against `original ++ supplementary` without any caching.
#[must_use]
pub fn bind(params: &[ParamType], original: &[Value], supplementary: &[Value]) -> Vec<Option<Value>> {
    if params.is_empty() {
        return Vec::new();
    }
    let available = available(original, supplementary);
    BindingPlan::compute(params, &available).apply(&available)
}

fn available<'a>(original: &'a [Value], supplementary: &'a [Value]) -> SmallVec<[&'a Value; INLINE_ARGS]> {
    original.iter().chain(supplementary).collect()
}

/// A binding policy: turns the values available for a call into handler arguments.
pub trait ParameterConverter: Send + Sync {
    fn convert(
        &self,
        target: &ActionTarget,
        original: &[Value],
        supplementary: &[Value],
    ) -> Vec<Option<Value>>;
}

/// The default policy: greedy type matching, optionally with memoized plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeMatchBinder {
    fixed_order: bool,
}

impl TypeMatchBinder {
    #[must_use]
    pub fn new(fixed_order: bool) -> Self {
        Self { fixed_order }
    }
}

impl ParameterConverter for TypeMatchBinder {
    fn convert(
        &self,
        target: &ActionTarget,
        original: &[Value],
        supplementary: &[Value],
    ) -> Vec<Option<Value>> {
        let params = target.params();
        if params.is_empty() {
            return Vec::new();
        }
        let available = available(original, supplementary);
        if target.fixed_order_override().unwrap_or(self.fixed_order) {
            let plan = target.binding_plan().get_or_init(|| {
                let plan = BindingPlan::compute(params, &available);
                trace!(handler = %target.type_name(), slots = ?plan.slots(), "binding plan memoized");
                plan
            });
            plan.apply(&available)
        } else {
            BindingPlan::compute(params, &available).apply(&available)
        }
    }
}

/// Chooses the binding policy for a call.
pub trait ConverterFactory: Send + Sync {
    fn converter(&self, ctx: &InvocationContext) -> Arc<dyn ParameterConverter>;
}

/// Hands every call the same [`TypeMatchBinder`].
#[derive(Clone)]
pub struct DefaultConverterFactory {
    binder: Arc<TypeMatchBinder>,
}

impl DefaultConverterFactory {
    #[must_use]
    pub fn new(fixed_order: bool) -> Self {
        Self {
            binder: Arc::new(TypeMatchBinder::new(fixed_order)),
        }
    }
}

impl ConverterFactory for DefaultConverterFactory {
    fn converter(&self, _ctx: &InvocationContext) -> Arc<dyn ParameterConverter> {
        Arc::clone(&self.binder) as Arc<dyn ParameterConverter>
    }
}
