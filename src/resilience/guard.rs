//! Protected execution of calls to external dependencies.
//!
//! # Responsibilities
//! - Ask the named breaker for permission before running the work
//! - Time the work and record its outcome
//! - Resolve denial and failure to the caller's fallback
//!
//! # Design Decisions
//! - Errors are swallowed at this boundary and kept only in the log
//! - A denied call never runs the work
//! - Async variants spawn on the Tokio runtime and return immediately;
//!   the breaker name is resolved before spawning so wiring bugs panic at
//!   the call site
//! - A panic inside async work counts as a failure; sync work panics
//!   propagate and release their permit

use futures_util::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::resilience::circuit_breaker::{BreakerSnapshot, CallPermit, CircuitBreaker, CircuitState};
use crate::resilience::registry::BreakerRegistry;

/// Result of a protected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution<T> {
    /// The work ran and returned this value.
    Completed(T),
    /// The circuit denied the call; this is the fallback.
    Rejected(T),
    /// The work ran and failed; this is the fallback.
    Failed(T),
}

impl<T> Execution<T> {
    pub fn used_fallback(&self) -> bool {
        !matches!(self, Self::Completed(_))
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Completed(v) | Self::Rejected(v) | Self::Failed(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Completed(v) | Self::Rejected(v) | Self::Failed(v) => v,
        }
    }

    /// `(value, used_fallback)`.
    pub fn into_parts(self) -> (T, bool) {
        let used_fallback = self.used_fallback();
        (self.into_value(), used_fallback)
    }
}

/// Entry point for protected calls, cheap to clone and share.
#[derive(Debug, Clone)]
pub struct FaultGuard {
    registry: Arc<BreakerRegistry>,
}

impl FaultGuard {
    pub fn new(registry: BreakerRegistry) -> Self {
        Self::from_registry(Arc::new(registry))
    }

    pub fn from_registry(registry: Arc<BreakerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<BreakerRegistry> {
        &self.registry
    }

    /// Run `work` under the named breaker, returning `fallback` on denial or error.
    pub fn execute<T, E, F>(&self, name: &str, work: F, fallback: T) -> Execution<T>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        let breaker = self.registry.get(name);
        let Some(permit) = breaker.try_acquire() else {
            log_rejected(breaker);
            return Execution::Rejected(fallback);
        };

        let start = Instant::now();
        let result = work();
        settle(breaker, permit, result, start.elapsed(), fallback)
    }

    /// Run a side-effect-only `procedure`; `true` iff it ran and succeeded.
    pub fn execute_void<E, F>(&self, name: &str, procedure: F) -> bool
    where
        F: FnOnce() -> Result<(), E>,
        E: fmt::Display,
    {
        !self.execute(name, procedure, ()).used_fallback()
    }

    /// Await `work` under the named breaker on the current task.
    pub async fn call<T, E, Fut>(&self, name: &str, work: Fut, fallback: T) -> Execution<T>
    where
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        run(self.registry.get(name), work, fallback).await
    }

    /// Spawn `work` under the named breaker and return its handle immediately.
    pub fn execute_async<T, E, Fut>(&self, name: &str, work: Fut, fallback: T) -> JoinHandle<Execution<T>>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let breaker = Arc::clone(self.registry.get(name));
        tokio::spawn(async move { run(&breaker, work, fallback).await })
    }

    /// Spawn a side-effect-only future; resolves to `true` iff it ran and succeeded.
    pub fn execute_void_async<E, Fut>(&self, name: &str, work: Fut) -> JoinHandle<bool>
    where
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let breaker = Arc::clone(self.registry.get(name));
        tokio::spawn(async move { !run(&breaker, work, ()).await.used_fallback() })
    }

    pub fn state(&self, name: &str) -> CircuitState {
        self.registry.get(name).state()
    }

    pub fn force_close(&self, name: &str) {
        self.registry.get(name).force_close();
    }

    pub fn force_open(&self, name: &str) {
        self.registry.get(name).force_open();
    }

    pub fn snapshot(&self, name: &str) -> BreakerSnapshot {
        self.registry.get(name).snapshot()
    }
}

async fn run<T, E, Fut>(breaker: &Arc<CircuitBreaker>, work: Fut, fallback: T) -> Execution<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let Some(permit) = breaker.try_acquire() else {
        log_rejected(breaker);
        return Execution::Rejected(fallback);
    };

    let start = Instant::now();
    let result = AssertUnwindSafe(work).catch_unwind().await;
    let elapsed = start.elapsed();

    match result {
        Ok(result) => settle(breaker, permit, result, elapsed, fallback),
        Err(payload) => {
            permit.record_call(true, elapsed);
            tracing::error!(
                breaker = %breaker.name(),
                panic = panic_message(&*payload),
                elapsed_ms = elapsed.as_millis() as u64,
                "Protected call panicked, returning fallback"
            );
            Execution::Failed(fallback)
        }
    }
}

fn settle<T, E>(
    breaker: &CircuitBreaker,
    permit: CallPermit,
    result: Result<T, E>,
    elapsed: Duration,
    fallback: T,
) -> Execution<T>
where
    E: fmt::Display,
{
    match result {
        Ok(value) => {
            let outcome = permit.record_call(false, elapsed);
            if outcome.is_slow() {
                tracing::debug!(
                    breaker = %breaker.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Slow call recorded"
                );
            }
            Execution::Completed(value)
        }
        Err(e) => {
            let outcome = permit.record_call(true, elapsed);
            tracing::error!(
                breaker = %breaker.name(),
                error = %e,
                outcome = outcome.kind.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Protected call failed, returning fallback"
            );
            Execution::Failed(fallback)
        }
    }
}

fn log_rejected(breaker: &CircuitBreaker) {
    tracing::warn!(breaker = %breaker.name(), "Circuit open, call skipped");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
