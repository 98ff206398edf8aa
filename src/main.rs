//! dependency-guard service
//!
//! Hosts the per-dependency circuit breakers, a periodic health monitor and
//! the admin HTTP surface.
//!
//! # Architecture Overview
//!
//! ```text
//!     caller ──▶ FaultGuard ──▶ CircuitBreaker ──▶ dependency
//!                    │               │
//!                    │ fallback      │ sliding window
//!                    ▼               ▼
//!                 caller       state transitions ──▶ logs + metrics
//!
//!     HealthMonitor ──tick──▶ HealthAggregator ──▶ breakers + probes
//!     admin router  ──────▶  /health, /admin/breakers/...
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use dependency_guard::admin::{self, AdminState};
use dependency_guard::config::{load_config, GuardConfig};
use dependency_guard::lifecycle::{build_services, startup, wait_for_shutdown_signal, Shutdown};
use dependency_guard::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "dependency-guard")]
#[command(about = "Per-dependency circuit breakers with aggregated health", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Built-in defaults are used without one.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dependency-guard starting");
    tracing::info!(
        config = ?args.config,
        breakers = config.breakers.len(),
        health_check_enabled = config.health_check.enabled,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match startup::parse_address("observability.metrics_address", &config.observability.metrics_address) {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(error = %e, "Metrics disabled"),
        }
    }

    let services = build_services(&config)?;
    let shutdown = Shutdown::new();
    let mut tasks = Vec::new();

    if let Some(monitor) = &services.monitor {
        tasks.push(tokio::spawn(Arc::clone(monitor).run(shutdown.subscribe())));
    }

    if config.admin.enabled {
        let listener = startup::bind_admin_listener(&config.admin.bind_address).await?;
        let state = AdminState {
            guard: services.guard.clone(),
            aggregator: Arc::clone(&services.aggregator),
            monitor: services.monitor.clone(),
        };
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, rx).await {
                tracing::error!(error = %e, "Admin server failed");
            }
        }));
    }

    wait_for_shutdown_signal().await;
    shutdown.trigger();

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Background task ended abnormally");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
