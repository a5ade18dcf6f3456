use std::time::Instant;

use tracing::{field, info_span, warn};

use super::Interceptor;
use crate::action::Value;
use crate::dispatcher::InvocationContext;

/// Opens an `action` span around the rest of the chain and records its latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn intercept(&self, ctx: &mut InvocationContext) -> anyhow::Result<Option<Value>> {
        let span = info_span!(
            "action",
            path = %ctx.path(),
            handler = %ctx.route().target().type_name(),
            executed = field::Empty,
            latency_us = field::Empty
        );
        let _entered = span.enter();

        let start = Instant::now();
        let outcome = ctx.invoke();
        let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        span.record("latency_us", latency_us);
        span.record("executed", ctx.is_executed());

        if let Err(err) = &outcome {
            warn!(error = %err, latency_us, "Action failed");
        }
        Ok(outcome?)
    }
}
