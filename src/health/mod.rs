//! Health aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! On demand (aggregator.rs):
//!     Registry (read-only)
//!     → circuit state per dependency
//!     → optional probe through the execution wrapper (probe.rs)
//!     → classification (state.rs)
//!
//! Periodic (active.rs):
//!     Timer tick
//!     → aggregator.check()
//!     → publish latest, log changes, export gauges
//! ```
//!
//! # Design Decisions
//! - HALF_OPEN counts as DOWN: a dependency is trusted again only once closed
//! - Criticality is static configuration, never inferred
//! - Probes share the dependency's breaker, so they cannot hammer a tripped one

pub mod active;
pub mod aggregator;
pub mod probe;
pub mod state;

pub use active::HealthMonitor;
pub use aggregator::HealthAggregator;
pub use probe::{Probe, ProbeError, TcpProbe};
pub use state::{AggregateHealth, DependencyHealth, HealthStatus};
