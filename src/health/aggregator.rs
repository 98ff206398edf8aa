//! Health aggregation across all protected dependencies.
//!
//! # Responsibilities
//! - Read every breaker's state
//! - Run configured liveness probes through the execution wrapper
//! - Classify each dependency and fold them into one status

use futures_util::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::config::schema::BreakerConfig;
use crate::health::probe::{Probe, TcpProbe};
use crate::health::state::{AggregateHealth, DependencyHealth};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::guard::FaultGuard;

/// Produces [`AggregateHealth`] on demand.
pub struct HealthAggregator {
    guard: FaultGuard,
    probes: HashMap<String, Arc<dyn Probe>>,
}

impl HealthAggregator {
    /// Aggregator without probes: health follows circuit state only.
    pub fn new(guard: FaultGuard) -> Self {
        Self {
            guard,
            probes: HashMap::new(),
        }
    }

    /// Aggregator with a TCP probe for every row that configures one.
    pub fn from_config(guard: FaultGuard, configs: &[BreakerConfig]) -> Self {
        let mut aggregator = Self::new(guard);
        for config in configs {
            if let Some(probe) = &config.probe {
                aggregator = aggregator.with_probe(&config.name, TcpProbe::from_config(probe));
            }
        }
        aggregator
    }

    /// Attach a probe to a registered dependency.
    ///
    /// # Panics
    /// If `name` has no registered breaker.
    pub fn with_probe(mut self, name: &str, probe: impl Probe + 'static) -> Self {
        let breaker = self.guard.registry().get(name);
        tracing::debug!(breaker = %breaker.name(), "Liveness probe attached");
        self.probes.insert(name.to_string(), Arc::new(probe));
        self
    }

    pub fn guard(&self) -> &FaultGuard {
        &self.guard
    }

    /// Classify every dependency, running probes concurrently.
    pub async fn check(&self) -> AggregateHealth {
        let checks = self
            .guard
            .registry()
            .iter()
            .map(|breaker| self.check_dependency(breaker));
        let dependencies: BTreeMap<_, _> = join_all(checks).await.into_iter().collect();
        AggregateHealth::from_dependencies(dependencies)
    }

    /// Classify from circuit state alone, without probing.
    pub fn check_states(&self) -> AggregateHealth {
        let dependencies = self
            .guard
            .registry()
            .iter()
            .map(|breaker| {
                let health = DependencyHealth::classify(breaker.state(), None, breaker.is_critical());
                (breaker.name().to_string(), health)
            })
            .collect();
        AggregateHealth::from_dependencies(dependencies)
    }

    async fn check_dependency(&self, breaker: &Arc<CircuitBreaker>) -> (String, DependencyHealth) {
        let name = breaker.name();
        let circuit_state = breaker.state();

        let probe_ok = match self.probes.get(name) {
            Some(probe) => {
                // The fallback `()` doubles as the failure sentinel.
                let execution = self.guard.call(name, probe.probe(), ()).await;
                Some(!execution.used_fallback())
            }
            None => None,
        };

        let health = DependencyHealth::classify(circuit_state, probe_ok, breaker.is_critical());
        (name.to_string(), health)
    }
}

impl fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut probes: Vec<_> = self.probes.keys().collect();
        probes.sort();
        f.debug_struct("HealthAggregator")
            .field("guard", &self.guard)
            .field("probes", &probes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_breakers;
    use crate::health::probe::ProbeError;
    use crate::health::state::HealthStatus;
    use crate::resilience::circuit_breaker::CircuitState;
    use crate::resilience::registry::BreakerRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn guard() -> FaultGuard {
        FaultGuard::new(BreakerRegistry::from_configs(&default_breakers()).unwrap())
    }

    #[tokio::test]
    async fn test_all_closed_is_up() {
        let health = HealthAggregator::new(guard()).check().await;
        assert_eq!(health.status, HealthStatus::Up);
        assert_eq!(health.dependencies.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_probe_marks_closed_dependency_down() {
        let aggregator = HealthAggregator::new(guard())
            .with_probe("cache", || async { Err::<(), _>(ProbeError::new("PING timed out")) });

        let health = aggregator.check().await;
        let cache = health.dependency("cache").unwrap();
        assert_eq!(cache.status, HealthStatus::Down);
        assert_eq!(cache.circuit_state, CircuitState::Closed);
        assert_eq!(health.status, HealthStatus::Degraded);

        // The probe went through the breaker.
        let stats = aggregator.guard().snapshot("cache").stats;
        assert_eq!(stats.failed_calls, 1);
    }

    #[tokio::test]
    async fn test_probe_skipped_when_circuit_open() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let aggregator = HealthAggregator::new(guard()).with_probe("cache", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), ProbeError>(())
            }
        });
        aggregator.guard().force_open("cache");

        let health = aggregator.check().await;
        assert_eq!(health.dependency("cache").unwrap().status, HealthStatus::Down);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(aggregator.guard().snapshot("cache").stats.rejected_calls, 1);
    }

    #[tokio::test]
    async fn test_critical_dependency_down() {
        let aggregator = HealthAggregator::new(guard());
        aggregator.guard().force_open("storage");
        assert_eq!(aggregator.check().await.status, HealthStatus::Down);
        assert_eq!(aggregator.check_states().status, HealthStatus::Down);
    }

    #[test]
    #[should_panic(expected = "no circuit breaker registered")]
    fn test_probe_for_unknown_dependency_panics() {
        let _ = HealthAggregator::new(guard()).with_probe("queue", || async { Ok::<(), ProbeError>(()) });
    }
}
