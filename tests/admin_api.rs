//! Admin router exercised in-process.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use dependency_guard::admin::{setup_admin_router, AdminState};
use dependency_guard::config::{GuardConfig, ProbeConfig};
use dependency_guard::health::HealthMonitor;
use dependency_guard::lifecycle::build_services;
use dependency_guard::resilience::{CircuitState, FaultGuard};

fn router_with(config: &GuardConfig) -> (Router, FaultGuard, Option<Arc<HealthMonitor>>) {
    let services = build_services(config).unwrap();
    let state = AdminState {
        guard: services.guard.clone(),
        aggregator: Arc::clone(&services.aggregator),
        monitor: services.monitor.clone(),
    };
    (setup_admin_router(state), services.guard, services.monitor)
}

/// Router without a monitor: `/health` aggregates on every request.
fn router() -> (Router, FaultGuard) {
    let mut config = GuardConfig::default();
    config.health_check.enabled = false;
    let (router, guard, _) = router_with(&config);
    (router, guard)
}

/// Default config with a cache probe aimed at a port nobody listens on.
fn config_with_unreachable_cache_probe() -> GuardConfig {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let mut config = GuardConfig::default();
    let cache = config.breakers.iter_mut().find(|b| b.name == "cache").unwrap();
    cache.probe = Some(ProbeConfig {
        address,
        timeout_ms: 200,
    });
    config
}

async fn send(router: Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_up() {
    let (router, _) = router();
    let (status, body) = send(router, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["dependencies"]["storage"]["critical"], true);
}

#[tokio::test]
async fn test_health_degraded_is_still_ok() {
    let (router, guard) = router();
    guard.force_open("search");

    let (status, body) = send(router, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DEGRADED");
    assert_eq!(body["dependencies"]["search"]["status"], "DOWN");
    assert_eq!(body["dependencies"]["search"]["circuit_state"], "OPEN");
}

#[tokio::test]
async fn test_health_down_is_unavailable() {
    let (router, guard) = router();
    guard.force_open("storage");

    let (status, body) = send(router, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "DOWN");
}

#[tokio::test]
async fn test_list_breakers_sorted() {
    let (router, _) = router();
    let (status, body) = send(router, Method::GET, "/admin/breakers").await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["cache", "search", "storage"]);
}

#[tokio::test]
async fn test_open_then_close_override() {
    let (router, guard) = router();

    let (status, body) = send(router.clone(), Method::POST, "/admin/breakers/cache/open").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "OPEN");
    assert_eq!(guard.state("cache"), CircuitState::Open);

    let (status, body) = send(router.clone(), Method::POST, "/admin/breakers/cache/close").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "CLOSED");
    assert_eq!(body["buffered_calls"], 0);

    let (_, body) = send(router, Method::GET, "/admin/breakers/cache").await;
    assert_eq!(body["stats"]["times_opened"], 1);
}

#[tokio::test]
async fn test_unknown_breaker_is_not_found() {
    let (router, _) = router();

    let (status, body) = send(router.clone(), Method::GET, "/admin/breakers/queue").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("'queue'"));

    let (status, _) = send(router, Method::POST, "/admin/breakers/queue/close").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_serves_monitor_snapshot() {
    let (router, guard, monitor) = router_with(&GuardConfig::default());
    let monitor = monitor.expect("health checks are enabled by default");

    guard.force_open("search");
    let (status, body) = send(router.clone(), Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    // Not aggregated yet.
    assert_eq!(body["status"], "UP");

    monitor.refresh().await;
    let (_, body) = send(router, Method::GET, "/health").await;
    assert_eq!(body["status"], "DEGRADED");
    assert_eq!(body["dependencies"]["search"]["circuit_state"], "OPEN");
}

#[tokio::test]
async fn test_health_polling_leaves_breakers_untouched() {
    let (router, guard, monitor) = router_with(&config_with_unreachable_cache_probe());
    assert!(monitor.is_some());

    for _ in 0..5 {
        let (status, body) = send(router.clone(), Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dependencies"]["cache"]["status"], "UP");
    }

    let cache = guard.snapshot("cache");
    assert_eq!(cache.state, CircuitState::Closed);
    assert_eq!(cache.stats.failed_calls, 0);
}

#[tokio::test]
async fn test_health_without_monitor_checks_per_request() {
    let mut config = config_with_unreachable_cache_probe();
    config.health_check.enabled = false;
    let (router, guard, _) = router_with(&config);

    let (status, body) = send(router, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dependencies"]["cache"]["status"], "DOWN");
    assert_eq!(guard.snapshot("cache").stats.failed_calls, 1);
}
