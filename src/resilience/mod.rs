//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Protected call:
//!     → guard.rs (resolve breaker, ask permission, time the work)
//!     → circuit_breaker.rs (permit, record outcome, transition)
//!     → window.rs (rolling failure / slow-call accounting)
//!
//! Startup:
//!     config rows → registry.rs (one breaker per dependency)
//! ```
//!
//! # Design Decisions
//! - Breakers are local to the process; nothing is shared across instances
//! - The breaker measures time, it never imposes timeouts
//! - Denied and failed calls resolve to the caller's fallback

pub mod circuit_breaker;
pub mod guard;
pub mod outcome;
pub mod registry;
pub mod window;

pub use circuit_breaker::{BreakerSnapshot, CallPermit, CircuitBreaker, CircuitState, StatsSnapshot};
pub use guard::{Execution, FaultGuard};
pub use outcome::{Outcome, OutcomeKind};
pub use registry::{BreakerRegistry, RegistryError};
pub use window::{SlidingWindow, WindowCounts};
