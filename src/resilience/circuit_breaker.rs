//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through and are recorded
//! - Open: dependency assumed down, calls are short-circuited
//! - Half-Open: a bounded batch of trial calls tests recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure or slow-call rate >= threshold, once minimum_calls are buffered
//! Open → Half-Open: first acquire after open_wait_duration (lazy, no timer)
//! Half-Open → Closed: trial batch rates below both thresholds
//! Half-Open → Open: trial batch rates at or above either threshold
//! ```
//!
//! # Design Decisions
//! - Per-dependency breaker, one lock per breaker, never a shared lock
//! - Permission is an RAII permit; dropping it unrecorded frees its trial slot
//! - Every transition starts a new epoch; results from older epochs are ignored
//! - Denial is a `None`, not an error
//! - The half-open batch is decided once every trial outcome is recorded, not
//!   when the last trial permit is issued. The breaker imposes no timeouts, so
//!   a trial call that hangs keeps the circuit HALF_OPEN, denying all other
//!   calls, until it returns or its permit is dropped. Bound dependency calls
//!   with a client-side timeout.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::schema::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::outcome::{Outcome, OutcomeKind};
use crate::resilience::window::{SlidingWindow, WindowCounts};

/// Circuit state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative call statistics, never reset.
#[derive(Debug, Default)]
struct BreakerStats {
    successful_calls: AtomicU64,
    failed_calls: AtomicU64,
    slow_calls: AtomicU64,
    rejected_calls: AtomicU64,
    times_opened: AtomicU64,
}

/// Point-in-time copy of [`BreakerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub slow_calls: u64,
    pub rejected_calls: u64,
    pub times_opened: u64,
}

/// Introspection view of one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub critical: bool,
    pub failure_rate: f64,
    pub slow_call_rate: f64,
    pub buffered_calls: u32,
    pub stats: StatsSnapshot,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    epoch: u64,
    window: SlidingWindow,
    opened_at: Option<Instant>,
    half_open_issued: u32,
    trial: WindowCounts,
}

/// One breaker protecting one named dependency.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
    stats: BreakerStats,
}

impl CircuitBreaker {
    /// Create a closed breaker with an empty window.
    pub fn new(config: BreakerConfig) -> Self {
        let inner = BreakerInner {
            state: CircuitState::Closed,
            epoch: 0,
            window: SlidingWindow::from_config(&config),
            opened_at: None,
            half_open_issued: 0,
            trial: WindowCounts::default(),
        };
        metrics::record_state(&config.name, CircuitState::Closed);
        Self {
            name: config.name.clone(),
            config,
            inner: Mutex::new(inner),
            stats: BreakerStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn is_critical(&self) -> bool {
        self.config.critical
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ask for permission to call the dependency.
    ///
    /// Returns `None` when the circuit is open (and the wait has not elapsed or
    /// automatic half-open is disabled) or when the half-open trial budget is
    /// spent. The check and the trial-slot increment happen under one lock, so
    /// concurrent callers can never exceed the budget.
    pub fn try_acquire(self: &Arc<Self>) -> Option<CallPermit> {
        let now = Instant::now();
        let mut inner = self.lock();

        let permitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let waited = inner.opened_at.map_or(true, |at| {
                    now.saturating_duration_since(at) >= self.config.open_wait_duration()
                });
                if waited && self.config.auto_transition_to_half_open {
                    self.transition(&mut inner, CircuitState::HalfOpen, now);
                    // This call is trial #1.
                    inner.half_open_issued = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_issued < self.config.half_open_trial_calls {
                    inner.half_open_issued += 1;
                    true
                } else {
                    false
                }
            }
        };
        let epoch = inner.epoch;
        drop(inner);

        if permitted {
            Some(CallPermit {
                breaker: Arc::clone(self),
                epoch,
                armed: true,
            })
        } else {
            self.stats.rejected_calls.fetch_add(1, Ordering::Relaxed);
            metrics::record_rejected(&self.name);
            None
        }
    }

    /// Record the outcome of a call permitted in `epoch` and re-evaluate state.
    fn on_result(&self, epoch: u64, outcome: Outcome) {
        self.record_stats(outcome.kind);

        let now = Instant::now();
        let mut inner = self.lock();
        if inner.epoch != epoch {
            tracing::debug!(
                breaker = %self.name,
                outcome = outcome.kind.as_str(),
                "Ignoring outcome of a call permitted before the last transition"
            );
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.record(outcome.kind, now);
                if !inner.window.is_evaluable(now) {
                    return;
                }
                let failure_rate = inner.window.failure_rate(now);
                let slow_call_rate = inner.window.slow_rate(now);
                if self.exceeds_thresholds(failure_rate, slow_call_rate) {
                    tracing::warn!(
                        breaker = %self.name,
                        failure_rate,
                        slow_call_rate,
                        "Threshold reached, opening circuit"
                    );
                    self.transition(&mut inner, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                inner.window.record(outcome.kind, now);
                inner.trial.add(outcome.kind);
                if inner.trial.total < self.config.half_open_trial_calls {
                    return;
                }
                let failure_rate = inner.trial.failure_rate();
                let slow_call_rate = inner.trial.slow_rate();
                tracing::info!(
                    breaker = %self.name,
                    failure_rate,
                    slow_call_rate,
                    "Trial batch complete"
                );
                let next = if self.exceeds_thresholds(failure_rate, slow_call_rate) {
                    CircuitState::Open
                } else {
                    CircuitState::Closed
                };
                self.transition(&mut inner, next, now);
            }
            // Open calls are never permitted, so no current-epoch result exists.
            CircuitState::Open => {}
        }
    }

    /// Free the trial slot of a permit dropped without a result.
    fn release(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch == epoch
            && inner.state == CircuitState::HalfOpen
            && inner.half_open_issued > inner.trial.total
        {
            inner.half_open_issued -= 1;
            tracing::debug!(breaker = %self.name, "Released unused trial permit");
        }
    }

    fn exceeds_thresholds(&self, failure_rate: f64, slow_call_rate: f64) -> bool {
        failure_rate >= self.config.failure_rate_threshold
            || slow_call_rate >= self.config.slow_call_rate_threshold
    }

    fn record_stats(&self, kind: OutcomeKind) {
        if kind.is_failure() {
            self.stats.failed_calls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.successful_calls.fetch_add(1, Ordering::Relaxed);
        }
        if kind.is_slow() {
            self.stats.slow_calls.fetch_add(1, Ordering::Relaxed);
        }
        metrics::record_call(&self.name, kind);
    }

    /// Move to `to`, starting a fresh epoch with an empty window.
    fn transition(&self, inner: &mut BreakerInner, to: CircuitState, now: Instant) {
        let from = inner.state;
        inner.state = to;
        inner.epoch += 1;
        inner.window.clear();
        inner.trial = WindowCounts::default();
        inner.half_open_issued = 0;
        inner.opened_at = (to == CircuitState::Open).then_some(now);

        if to == CircuitState::Open {
            self.stats.times_opened.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(breaker = %self.name, %from, %to, "Circuit breaker state transition");
        } else {
            tracing::info!(breaker = %self.name, %from, %to, "Circuit breaker state transition");
        }
        metrics::record_transition(&self.name, to);
    }

    /// Current state. An open circuit whose wait has elapsed still reads OPEN
    /// until the next acquire moves it to half-open.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Administrative override: close the circuit and clear the window.
    pub fn force_close(&self) {
        let mut inner = self.lock();
        let from = inner.state;
        if from == CircuitState::Closed {
            // Not a transition: in-flight calls stay in the current epoch.
            inner.window.clear();
        } else {
            self.transition(&mut inner, CircuitState::Closed, Instant::now());
        }
        tracing::warn!(breaker = %self.name, %from, "Circuit breaker manually forced closed");
    }

    /// Administrative override: open the circuit now.
    /// Forcing an open circuit open again restarts its wait.
    pub fn force_open(&self) {
        let mut inner = self.lock();
        let from = inner.state;
        let now = Instant::now();
        if from == CircuitState::Open {
            inner.opened_at = Some(now);
        } else {
            self.transition(&mut inner, CircuitState::Open, now);
        }
        tracing::warn!(breaker = %self.name, %from, "Circuit breaker manually forced open");
    }

    /// How long an open circuit still has to wait, if it is open.
    pub fn remaining_open_wait(&self) -> Option<Duration> {
        let inner = self.lock();
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => Some(
                self.config
                    .open_wait_duration()
                    .saturating_sub(at.elapsed()),
            ),
            _ => None,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            successful_calls: self.stats.successful_calls.load(Ordering::Relaxed),
            failed_calls: self.stats.failed_calls.load(Ordering::Relaxed),
            slow_calls: self.stats.slow_calls.load(Ordering::Relaxed),
            rejected_calls: self.stats.rejected_calls.load(Ordering::Relaxed),
            times_opened: self.stats.times_opened.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            critical: self.config.critical,
            failure_rate: inner.window.failure_rate(now),
            slow_call_rate: inner.window.slow_rate(now),
            buffered_calls: inner.window.size(now),
            stats: self.stats(),
        }
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// Permission to make one call, tied to the breaker epoch that granted it.
///
/// Record the outcome with [`CallPermit::record`]. A permit dropped without a
/// result gives its half-open trial slot back.
#[must_use = "a permit should be recorded once the call completes"]
pub struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    epoch: u64,
    armed: bool,
}

impl CallPermit {
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Record the call outcome.
    pub fn record(mut self, outcome: Outcome) {
        self.armed = false;
        self.breaker.on_result(self.epoch, outcome);
    }

    /// Classify a completed call against the breaker's slow threshold and record it.
    pub fn record_call(self, failed: bool, elapsed: Duration) -> Outcome {
        let outcome = Outcome::classify(failed, elapsed, self.breaker.config.slow_call_duration());
        self.record(outcome);
        outcome
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.release(self.epoch);
        }
    }
}

impl fmt::Debug for CallPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPermit")
            .field("breaker", &self.breaker.name)
            .field("epoch", &self.epoch)
            .finish()
    }
}
