//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use dependency_guard::config::BreakerConfig;
use dependency_guard::resilience::{BreakerRegistry, FaultGuard};

/// A breaker row with the thresholds the scenario tests reason about.
pub fn breaker(name: &str, window_size: u32, minimum_calls: u32, failure_rate: f64) -> BreakerConfig {
    BreakerConfig::new(name)
        .with_window_size(window_size)
        .with_minimum_calls(minimum_calls)
        .with_failure_rate_threshold(failure_rate)
        .with_slow_call_rate_threshold(100.0)
        .with_slow_call_duration(Duration::from_secs(5))
}

pub fn guard_with(configs: &[BreakerConfig]) -> FaultGuard {
    FaultGuard::new(BreakerRegistry::from_configs(configs).unwrap())
}

/// Captures every event as `(level, message)`.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl EventLog {
    pub fn count(&self, level: Level) -> usize {
        self.events.lock().unwrap().iter().filter(|(l, _)| *l == level).count()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for EventLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

/// Install an [`EventLog`] as the default subscriber for the current thread.
pub fn capture_events() -> (EventLog, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let log = EventLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (log, guard)
}
