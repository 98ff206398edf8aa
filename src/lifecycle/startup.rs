//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the breaker registry from validated configuration
//! - Wire the execution wrapper, health aggregator and monitor
//! - Bind the admin listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The registry is complete before anything can call through it

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::GuardConfig;
use crate::health::{HealthAggregator, HealthMonitor};
use crate::resilience::{BreakerRegistry, FaultGuard, RegistryError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the process runs, built once from configuration.
pub struct Services {
    pub guard: FaultGuard,
    pub aggregator: Arc<HealthAggregator>,
    /// Present when periodic health checks are enabled.
    pub monitor: Option<Arc<HealthMonitor>>,
}

pub fn build_services(config: &GuardConfig) -> Result<Services, StartupError> {
    let registry = BreakerRegistry::from_configs(&config.breakers)?;
    tracing::info!(
        breakers = registry.len(),
        names = ?registry.names(),
        "Circuit breaker registry built"
    );

    let guard = FaultGuard::new(registry);
    let aggregator = Arc::new(HealthAggregator::from_config(guard.clone(), &config.breakers));

    let monitor = config
        .health_check
        .enabled
        .then(|| Arc::new(HealthMonitor::new(Arc::clone(&aggregator), &config.health_check)));

    Ok(Services {
        guard,
        aggregator,
        monitor,
    })
}

pub fn parse_address(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

pub async fn bind_admin_listener(bind_address: &str) -> Result<TcpListener, StartupError> {
    let address = parse_address("admin.bind_address", bind_address)?;
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use crate::resilience::CircuitState;

    #[test]
    fn test_build_default_services() {
        let services = build_services(&GuardConfig::default()).unwrap();
        assert_eq!(services.guard.registry().names(), vec!["cache", "search", "storage"]);
        assert_eq!(services.guard.state("storage"), CircuitState::Closed);
        assert!(services.monitor.is_some());
    }

    #[test]
    fn test_monitor_disabled() {
        let mut config = GuardConfig::default();
        config.health_check.enabled = false;
        assert!(build_services(&config).unwrap().monitor.is_none());
    }

    #[test]
    fn test_duplicate_breaker_is_fatal() {
        let mut config = GuardConfig::default();
        config.breakers.push(BreakerConfig::new("cache"));
        let err = build_services(&config).err().unwrap();
        assert!(matches!(err, StartupError::Registry(RegistryError::Duplicate(ref n)) if n == "cache"));
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address("admin.bind_address", "127.0.0.1:8081").is_ok());
        let err = parse_address("admin.bind_address", "localhost").unwrap_err();
        assert_eq!(err.to_string(), "Invalid admin.bind_address 'localhost'");
    }

    #[tokio::test]
    async fn test_bind_admin_listener_ephemeral() {
        let listener = bind_admin_listener("127.0.0.1:0").await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
