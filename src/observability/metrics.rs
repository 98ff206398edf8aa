//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_calls_total` (counter): completed protected calls by breaker, outcome
//! - `breaker_calls_rejected_total` (counter): calls short-circuited by an open breaker
//! - `breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `breaker_transitions_total` (counter): state changes by breaker, target state
//! - `dependency_health` (gauge): 1=up, 0=down
//! - `aggregate_health` (gauge): 1=up, 0.5=degraded, 0=down
//!
//! # Design Decisions
//! - Updates are no-ops until a recorder is installed (tests, embedding hosts)
//! - Labels are breaker names, never per-call data

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::health::state::HealthStatus;
use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::outcome::OutcomeKind;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_call(breaker: &str, outcome: OutcomeKind) {
    counter!(
        "breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_rejected(breaker: &str) {
    counter!("breaker_calls_rejected_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("breaker_state", "breaker" => breaker.to_string()).set(value);
}

pub fn record_transition(breaker: &str, to: CircuitState) {
    counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    record_state(breaker, to);
}

pub fn record_dependency_health(dependency: &str, status: HealthStatus) {
    let value = if status == HealthStatus::Up { 1.0 } else { 0.0 };
    gauge!("dependency_health", "dependency" => dependency.to_string()).set(value);
}

pub fn record_aggregate_health(status: HealthStatus) {
    let value = match status {
        HealthStatus::Up => 1.0,
        HealthStatus::Degraded => 0.5,
        HealthStatus::Down => 0.0,
    };
    gauge!("aggregate_health").set(value);
}
