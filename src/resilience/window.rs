//! Sliding window of recent call outcomes.
//!
//! # Responsibilities
//! - Keep the last N outcomes (count-based) or the outcomes of the last N
//!   seconds (time-based)
//! - Maintain rolling failure and slow-call counts
//! - Compute failure rate and slow-call rate in percent
//!
//! # Design Decisions
//! - Counts are updated on insert and eviction, never recomputed from scratch
//! - Rates read 0 until `minimum_calls` outcomes are buffered
//! - Not internally synchronized: a window belongs to exactly one breaker and
//!   is only mutated under that breaker's lock
//! - Time is passed in by the caller so eviction is deterministic

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

use crate::config::schema::{BreakerConfig, WindowType};
use crate::resilience::outcome::OutcomeKind;

/// Aggregate counts over a set of outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowCounts {
    pub total: u32,
    /// Failures, slow or not.
    pub failures: u32,
    /// Slow calls, failed or not.
    pub slow: u32,
}

impl WindowCounts {
    pub fn add(&mut self, kind: OutcomeKind) {
        self.total += 1;
        if kind.is_failure() {
            self.failures += 1;
        }
        if kind.is_slow() {
            self.slow += 1;
        }
    }

    fn remove(&mut self, kind: OutcomeKind) {
        self.total -= 1;
        if kind.is_failure() {
            self.failures -= 1;
        }
        if kind.is_slow() {
            self.slow -= 1;
        }
    }

    fn merge(&mut self, other: &WindowCounts) {
        self.total += other.total;
        self.failures += other.failures;
        self.slow += other.slow;
    }

    /// Failure rate in percent, 0 when empty.
    pub fn failure_rate(&self) -> f64 {
        percent(self.failures, self.total)
    }

    /// Slow-call rate in percent, 0 when empty.
    pub fn slow_rate(&self) -> f64 {
        percent(self.slow, self.total)
    }
}

fn percent(part: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * part as f64 / total as f64
}

/// Bounded outcome buffer for one breaker.
#[derive(Debug)]
pub struct SlidingWindow {
    minimum_calls: u32,
    store: Store,
}

#[derive(Debug)]
enum Store {
    Count(CountWindow),
    Time(TimeWindow),
}

impl SlidingWindow {
    /// Window holding the last `capacity` outcomes.
    pub fn count_based(capacity: u32, minimum_calls: u32) -> Self {
        Self {
            minimum_calls,
            store: Store::Count(CountWindow::new(capacity)),
        }
    }

    /// Window holding the outcomes of the last `seconds` seconds.
    pub fn time_based(seconds: u32, minimum_calls: u32) -> Self {
        Self {
            minimum_calls,
            store: Store::Time(TimeWindow::new(seconds)),
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        match config.window_type {
            WindowType::CountBased => Self::count_based(config.window_size, config.minimum_calls),
            WindowType::TimeBased => Self::time_based(config.window_size, config.minimum_calls),
        }
    }

    /// Append an outcome, evicting whatever falls out of the window.
    pub fn record(&mut self, kind: OutcomeKind, now: Instant) {
        match &mut self.store {
            Store::Count(window) => window.record(kind),
            Store::Time(window) => window.record(kind, now),
        }
    }

    /// Raw counts of the outcomes currently in the window.
    pub fn counts(&self, now: Instant) -> WindowCounts {
        match &self.store {
            Store::Count(window) => window.counts,
            Store::Time(window) => window.counts(now),
        }
    }

    /// Current occupancy.
    pub fn size(&self, now: Instant) -> u32 {
        self.counts(now).total
    }

    /// True once enough outcomes are buffered for rates to be meaningful.
    pub fn is_evaluable(&self, now: Instant) -> bool {
        self.size(now) >= self.minimum_calls
    }

    /// Failure rate in percent, or 0 below `minimum_calls`.
    pub fn failure_rate(&self, now: Instant) -> f64 {
        let counts = self.counts(now);
        if counts.total < self.minimum_calls {
            return 0.0;
        }
        counts.failure_rate()
    }

    /// Slow-call rate in percent, or 0 below `minimum_calls`.
    pub fn slow_rate(&self, now: Instant) -> f64 {
        let counts = self.counts(now);
        if counts.total < self.minimum_calls {
            return 0.0;
        }
        counts.slow_rate()
    }

    pub fn clear(&mut self) {
        match &mut self.store {
            Store::Count(window) => window.clear(),
            Store::Time(window) => window.clear(),
        }
    }
}

#[derive(Debug)]
struct CountWindow {
    capacity: usize,
    outcomes: VecDeque<OutcomeKind>,
    counts: WindowCounts,
}

impl CountWindow {
    fn new(capacity: u32) -> Self {
        let capacity = capacity.max(1) as usize;
        Self {
            capacity,
            outcomes: VecDeque::with_capacity(capacity),
            counts: WindowCounts::default(),
        }
    }

    fn record(&mut self, kind: OutcomeKind) {
        if self.outcomes.len() == self.capacity {
            if let Some(evicted) = self.outcomes.pop_front() {
                self.counts.remove(evicted);
            }
        }
        self.outcomes.push_back(kind);
        self.counts.add(kind);
    }

    fn clear(&mut self) {
        self.outcomes.clear();
        self.counts = WindowCounts::default();
    }
}

/// One-second buckets in a ring; a bucket is live while younger than the window.
#[derive(Debug)]
struct TimeWindow {
    origin: Instant,
    buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    second: u64,
    counts: WindowCounts,
}

impl TimeWindow {
    fn new(seconds: u32) -> Self {
        Self {
            origin: Instant::now(),
            buckets: vec![Bucket::default(); seconds.max(1) as usize],
        }
    }

    fn second(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.origin).as_secs()
    }

    fn record(&mut self, kind: OutcomeKind, now: Instant) {
        let second = self.second(now);
        let len = self.buckets.len() as u64;
        let bucket = &mut self.buckets[(second % len) as usize];
        if bucket.second != second {
            // Stale bucket from a previous lap of the ring.
            *bucket = Bucket {
                second,
                counts: WindowCounts::default(),
            };
        }
        bucket.counts.add(kind);
    }

    fn counts(&self, now: Instant) -> WindowCounts {
        let second = self.second(now);
        let len = self.buckets.len() as u64;
        let mut counts = WindowCounts::default();
        for bucket in &self.buckets {
            if bucket.second <= second && second - bucket.second < len {
                counts.merge(&bucket.counts);
            }
        }
        counts
    }

    fn clear(&mut self) {
        self.buckets.fill(Bucket::default());
    }
}
