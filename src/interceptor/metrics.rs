use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::Interceptor;
use crate::action::Value;
use crate::dispatcher::InvocationContext;

/// Interceptor collecting invocation counters.
///
/// All counters are atomics updated with `Ordering::Relaxed`: cheap to collect,
/// eventually consistent to read. One instance may be shared by any number of
/// routes and threads.
///
/// Metrics collected:
/// - invocations passing through this interceptor
/// - failures raised by anything further down the chain
/// - short-circuits: calls that returned without the handler running
/// - cumulative latency of the rest of the chain
#[derive(Debug, Default)]
pub struct MetricsInterceptor {
    invocations: AtomicUsize,
    failures: AtomicUsize,
    short_circuits: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsInterceptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn short_circuits(&self) -> usize {
        self.short_circuits.load(Ordering::Relaxed)
    }

    /// Mean latency of the wrapped chain; zero before the first invocation.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.invocations.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl Interceptor for MetricsInterceptor {
    fn intercept(&self, ctx: &mut InvocationContext) -> anyhow::Result<Option<Value>> {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let outcome = ctx.invoke();
        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(elapsed, Ordering::Relaxed);

        match &outcome {
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) if !ctx.is_executed() => {
                self.short_circuits.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {}
        }
        Ok(outcome?)
    }
}
