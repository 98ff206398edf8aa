//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → breaker rows handed to the registry once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breaker state never survives a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerConfig, GuardConfig, HealthCheckConfig, LogFormat, ObservabilityConfig,
    ProbeConfig, WindowType,
};
