//! Breaker registry.
//!
//! # Responsibilities
//! - Create one breaker per configured dependency at startup
//! - Resolve breakers by name for every protected call
//!
//! # Design Decisions
//! - The map is built once and never mutated, so lookups take no lock
//! - State lives inside each breaker, not in the map
//! - An unknown name at call time is a programming error and panics
//! - Rows are validated here too, so library callers that skip
//!   `load_config` cannot register a breaker that silently misbehaves

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::schema::BreakerConfig;
use crate::config::validation::{validate_breaker, ValidationError};
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("circuit breaker '{0}' is registered twice")]
    Duplicate(String),

    #[error("invalid circuit breaker configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Named collection of breakers, read-only after construction.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: HashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Build the registry from the configuration table.
    pub fn from_configs<'a, I>(configs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = &'a BreakerConfig>,
    {
        let mut breakers = HashMap::new();
        for config in configs {
            if breakers.contains_key(&config.name) {
                return Err(RegistryError::Duplicate(config.name.clone()));
            }
            let errors = validate_breaker(config);
            if !errors.is_empty() {
                return Err(RegistryError::Invalid(errors));
            }
            tracing::info!(
                breaker = %config.name,
                critical = config.critical,
                window_type = ?config.window_type,
                window_size = config.window_size,
                failure_rate_threshold = config.failure_rate_threshold,
                open_wait_ms = config.open_wait_duration_ms,
                "Circuit breaker registered"
            );
            breakers.insert(
                config.name.clone(),
                Arc::new(CircuitBreaker::new(config.clone())),
            );
        }
        Ok(Self { breakers })
    }

    /// Resolve a breaker by name.
    ///
    /// # Panics
    /// If no breaker is registered under `name`: calling an unconfigured
    /// dependency is a wiring bug that must surface at first use.
    pub fn get(&self, name: &str) -> &Arc<CircuitBreaker> {
        match self.breakers.get(name) {
            Some(breaker) => breaker,
            None => panic!("no circuit breaker registered for dependency '{name}'"),
        }
    }

    pub fn try_get(&self, name: &str) -> Option<&Arc<CircuitBreaker>> {
        self.breakers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.breakers.contains_key(name)
    }

    pub fn is_critical(&self, name: &str) -> bool {
        self.get(name).is_critical()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.breakers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CircuitBreaker>> {
        self.breakers.values()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.values().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}
