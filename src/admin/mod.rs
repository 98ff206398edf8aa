//! Admin HTTP surface: aggregate health and manual breaker overrides.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use self::handlers::*;
use crate::health::{HealthAggregator, HealthMonitor};
use crate::lifecycle::shutdown;
use crate::resilience::FaultGuard;

#[derive(Clone)]
pub struct AdminState {
    pub guard: FaultGuard,
    pub aggregator: Arc<HealthAggregator>,
    /// When set, `/health` serves the monitor's latest result instead of probing.
    pub monitor: Option<Arc<HealthMonitor>>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/admin/breakers", get(list_breakers))
        .route("/admin/breakers/{name}", get(get_breaker))
        .route("/admin/breakers/{name}/close", post(close_breaker))
        .route("/admin/breakers/{name}/open", post(open_breaker))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin router until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin server starting");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(shutdown::wait_for(shutdown))
        .await?;

    tracing::info!("Admin server stopped");
    Ok(())
}
