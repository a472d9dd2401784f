//! ChaosLayer behavior inside an ordinary axum router.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    routing::get,
    Router,
};
use chaos_proxy::http::{X_CHAOS_DELAY_MS, X_CHAOS_INJECTED};
use chaos_proxy::{ChaosConfig, ChaosLayer, ChaosPolicy};
use tower::ServiceExt;

mod common;

/// Router whose handlers count how often they ran.
fn app(config: &ChaosConfig) -> (Router, Arc<AtomicU32>, ChaosLayer) {
    let calls = Arc::new(AtomicU32::new(0));
    let get_calls = calls.clone();
    let post_calls = calls.clone();
    let layer = ChaosLayer::new(ChaosPolicy::compile(config).unwrap());

    let router = Router::new()
        .route(
            "/items",
            get(move || {
                let calls = get_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "items"
                }
            })
            .post(move || {
                let calls = post_calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    StatusCode::CREATED
                }
            }),
        )
        .route("/health", get(|| async { "ok" }))
        .layer(layer.clone());

    (router, calls, layer)
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_injected_error_short_circuits_handler() {
    let mut config = common::always_on_config();
    config.latency.enabled = false;
    config.error.status_codes = vec![503];
    let (app, calls, _) = app(&config);

    let response = app.oneshot(request(Method::GET, "/items")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()[&X_CHAOS_INJECTED], "error");
    assert_eq!(calls.load(Ordering::SeqCst), 0, "handler must not run");

    let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["chaos"], true);
    assert_eq!(json["status"], 503);
}

#[tokio::test]
async fn test_latency_only_delays_then_forwards() {
    let mut config = common::always_on_config();
    config.error.enabled = false;
    config.latency.min_ms = 50;
    config.latency.max_ms = 50;
    let (app, calls, _) = app(&config);

    let start = Instant::now();
    let response = app.oneshot(request(Method::GET, "/items")).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[&X_CHAOS_INJECTED], "latency");
    assert_eq!(response.headers()[&X_CHAOS_DELAY_MS], "50");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delay_and_error_together() {
    let mut config = common::always_on_config();
    config.latency.min_ms = 20;
    config.latency.max_ms = 20;
    config.error.status_codes = vec![500];
    let (app, calls, _) = app(&config);

    let start = Instant::now();
    let response = app.oneshot(request(Method::GET, "/items")).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[&X_CHAOS_DELAY_MS], "20");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_method_filter_passes_other_methods() {
    let mut config = common::always_on_config();
    config.methods = vec!["POST".into()];
    config.latency.enabled = false;
    let (app, calls, _) = app(&config);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/items"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(&X_CHAOS_INJECTED).is_none());

    let response = app.oneshot(request(Method::POST, "/items")).await.unwrap();
    assert!(response.status().is_server_error());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disallowed_environment_passes_through() {
    let mut config = common::always_on_config();
    config.environment = Some("production".into());
    let (app, calls, _) = app(&config);

    let response = app.oneshot(request(Method::GET, "/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_excluded_path_and_bypass_header() {
    let (app, calls, _) = app(&common::always_on_config());

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bypass = Request::builder()
        .uri("/items")
        .header("x-chaos-bypass", "1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(bypass).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_policy_swap_takes_effect_immediately() {
    let mut config = common::always_on_config();
    config.latency.enabled = false;
    let (app, _, layer) = app(&config);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/items"))
        .await
        .unwrap();
    assert!(response.status().is_server_error());

    config.enabled = false;
    layer
        .engine()
        .update(ChaosPolicy::compile(&config).unwrap());

    let response = app.oneshot(request(Method::GET, "/items")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_zero_probability_never_touches_requests() {
    let mut config = common::always_on_config();
    config.probability = 0.0;
    let (app, calls, _) = app(&config);

    for _ in 0..50 {
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/items"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(&X_CHAOS_INJECTED).is_none());
    }
    assert_eq!(calls.load(Ordering::SeqCst), 50);
}
