//! Periodic health aggregation.
//!
//! # Responsibilities
//! - Re-run the aggregator on a fixed interval
//! - Publish the latest result for readers without blocking them
//! - Log and export status changes

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::aggregator::HealthAggregator;
use crate::health::state::{AggregateHealth, HealthStatus};
use crate::observability::metrics;

pub struct HealthMonitor {
    aggregator: Arc<HealthAggregator>,
    interval: Duration,
    latest: ArcSwap<AggregateHealth>,
}

impl HealthMonitor {
    /// The initial snapshot reflects circuit state only; probes run on the first tick.
    pub fn new(aggregator: Arc<HealthAggregator>, config: &HealthCheckConfig) -> Self {
        let initial = aggregator.check_states();
        Self {
            aggregator,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            latest: ArcSwap::from_pointee(initial),
        }
    }

    /// Most recent aggregate health.
    pub fn latest(&self) -> Arc<AggregateHealth> {
        self.latest.load_full()
    }

    /// Aggregate now and publish the result.
    pub async fn refresh(&self) -> Arc<AggregateHealth> {
        let current = Arc::new(self.aggregator.check().await);
        let previous = self.latest.swap(Arc::clone(&current));
        log_changes(&previous, &current);

        for (name, dependency) in &current.dependencies {
            metrics::record_dependency_health(name, dependency.status);
        }
        metrics::record_aggregate_health(current.status);
        current
    }

    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Health monitor starting");

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn log_changes(previous: &AggregateHealth, current: &AggregateHealth) {
    for (name, dependency) in &current.dependencies {
        let before = previous.dependency(name).map(|d| d.status);
        if before == Some(dependency.status) {
            continue;
        }
        if dependency.status == HealthStatus::Up {
            tracing::info!(dependency = %name, status = %dependency.status, "Dependency health changed");
        } else {
            tracing::warn!(
                dependency = %name,
                status = %dependency.status,
                circuit_state = %dependency.circuit_state,
                message = %dependency.message,
                "Dependency health changed"
            );
        }
    }

    if previous.status != current.status {
        if current.status == HealthStatus::Up {
            tracing::info!(from = %previous.status, to = %current.status, "Aggregate health changed");
        } else {
            tracing::warn!(from = %previous.status, to = %current.status, "Aggregate health changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_breakers;
    use crate::lifecycle::Shutdown;
    use crate::resilience::{BreakerRegistry, FaultGuard};

    fn monitor() -> Arc<HealthMonitor> {
        let guard = FaultGuard::new(BreakerRegistry::from_configs(&default_breakers()).unwrap());
        let aggregator = Arc::new(HealthAggregator::new(guard));
        Arc::new(HealthMonitor::new(aggregator, &HealthCheckConfig::default()))
    }

    #[tokio::test]
    async fn test_refresh_publishes_latest() {
        let monitor = monitor();
        assert_eq!(monitor.latest().status, HealthStatus::Up);

        monitor.aggregator.guard().force_open("search");
        // Not visible until the next aggregation.
        assert_eq!(monitor.latest().status, HealthStatus::Up);

        let refreshed = monitor.refresh().await;
        assert_eq!(refreshed.status, HealthStatus::Degraded);
        assert_eq!(monitor.latest().status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let monitor = monitor();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(Arc::clone(&monitor).run(shutdown.subscribe()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should exit on shutdown")
            .unwrap();
    }
}
