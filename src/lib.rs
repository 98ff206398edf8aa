//! Per-dependency circuit breakers with health aggregation.
//!
//! Every protected call goes through [`FaultGuard`], which resolves the named
//! breaker, asks it for permission, times the work and feeds the outcome back.
//! Denied or failed calls resolve to the caller's fallback value.

pub mod admin;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GuardConfig;
pub use health::{AggregateHealth, HealthAggregator, HealthStatus};
pub use lifecycle::Shutdown;
pub use resilience::{BreakerRegistry, CircuitBreaker, CircuitState, Execution, FaultGuard};
