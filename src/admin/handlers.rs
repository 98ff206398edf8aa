use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::admin::AdminState;
use crate::health::{AggregateHealth, HealthStatus};
use crate::resilience::{BreakerSnapshot, CircuitBreaker};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum AdminError {
    UnknownBreaker(String),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        match self {
            AdminError::UnknownBreaker(name) => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: format!("no circuit breaker registered for dependency '{name}'"),
                }),
            )
                .into_response(),
        }
    }
}

fn lookup(state: &AdminState, name: &str) -> Result<Arc<CircuitBreaker>, AdminError> {
    state
        .guard
        .registry()
        .try_get(name)
        .cloned()
        .ok_or_else(|| AdminError::UnknownBreaker(name.to_string()))
}

/// Aggregate health; 503 only when a critical dependency is down.
///
/// Serves the periodic monitor's snapshot so polling never drives probes
/// through the breakers. Without a monitor the check runs per request.
pub async fn get_health(State(state): State<AdminState>) -> (StatusCode, Json<AggregateHealth>) {
    let health = match &state.monitor {
        Some(monitor) => AggregateHealth::clone(&monitor.latest()),
        None => state.aggregator.check().await,
    };
    let code = match health.status {
        HealthStatus::Up | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(health))
}

pub async fn list_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.guard.registry().snapshots())
}

pub async fn get_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, AdminError> {
    Ok(Json(lookup(&state, &name)?.snapshot()))
}

pub async fn close_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, AdminError> {
    let breaker = lookup(&state, &name)?;
    breaker.force_close();
    Ok(Json(breaker.snapshot()))
}

pub async fn open_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, AdminError> {
    let breaker = lookup(&state, &name)?;
    breaker.force_open();
    Ok(Json(breaker.snapshot()))
}
