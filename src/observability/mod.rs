//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers, the execution wrapper and the health aggregator produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Every denial, failure and override carries the breaker name
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
