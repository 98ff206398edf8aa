//! Health classification.
//!
//! # Per-dependency
//! ```text
//! CLOSED + probe ok (or no probe) → UP
//! CLOSED + probe failed           → DOWN
//! HALF_OPEN                       → DOWN (not trusted until the trial batch closes it)
//! OPEN                            → DOWN
//! ```
//!
//! # Aggregate
//! ```text
//! all UP              → UP
//! any critical DOWN   → DOWN
//! otherwise any DOWN  → DEGRADED
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::resilience::circuit_breaker::CircuitState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Degraded,
    Down,
}

impl HealthStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Degraded => "DEGRADED",
            Self::Down => "DOWN",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyHealth {
    pub status: HealthStatus,
    pub circuit_state: CircuitState,
    pub critical: bool,
    pub message: String,
}

impl DependencyHealth {
    /// Classify from the circuit state and the probe result, if a probe ran.
    pub fn classify(circuit_state: CircuitState, probe_ok: Option<bool>, critical: bool) -> Self {
        let (status, message) = match (circuit_state, probe_ok) {
            (CircuitState::Closed, None) => (HealthStatus::Up, "circuit closed"),
            (CircuitState::Closed, Some(true)) => (HealthStatus::Up, "circuit closed, probe succeeded"),
            (CircuitState::Closed, Some(false)) => {
                (HealthStatus::Down, "circuit closed but liveness probe failed")
            }
            (CircuitState::HalfOpen, _) => (HealthStatus::Down, "circuit half-open, recovery on trial"),
            (CircuitState::Open, _) => (HealthStatus::Down, "circuit open, calls are short-circuited"),
        };
        Self {
            status,
            circuit_state,
            critical,
            message: message.to_string(),
        }
    }
}

/// System-wide health with per-dependency detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateHealth {
    pub status: HealthStatus,
    pub dependencies: BTreeMap<String, DependencyHealth>,
}

impl AggregateHealth {
    pub fn from_dependencies(dependencies: BTreeMap<String, DependencyHealth>) -> Self {
        Self {
            status: aggregate(dependencies.values()),
            dependencies,
        }
    }

    pub fn dependency(&self, name: &str) -> Option<&DependencyHealth> {
        self.dependencies.get(name)
    }
}

/// Fold dependency health into one status.
pub fn aggregate<'a, I>(dependencies: I) -> HealthStatus
where
    I: IntoIterator<Item = &'a DependencyHealth>,
{
    let mut status = HealthStatus::Up;
    for dependency in dependencies {
        if dependency.status == HealthStatus::Up {
            continue;
        }
        if dependency.critical {
            return HealthStatus::Down;
        }
        status = HealthStatus::Degraded;
    }
    status
}
