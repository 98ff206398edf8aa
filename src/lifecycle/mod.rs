//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build registry → Wire health → Bind admin
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast stop → Monitor exits, admin drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then breakers, then listeners
//! - Breaker state is in-memory only and is lost on exit

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_shutdown_signal;
pub use startup::{build_services, Services, StartupError};
