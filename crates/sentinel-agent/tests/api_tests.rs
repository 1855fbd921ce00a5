//! Integration tests for the agent API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use sentinel_agent::api::{create_router, AppState};
use sentinel_lib::{health::components, EngineConfig, SentinelEngine};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn setup_test_app() -> (Router, Arc<AppState>) {
    let engine = Arc::new(SentinelEngine::open(EngineConfig::in_memory()));
    engine.health().register(components::API);

    let state = Arc::new(AppState::new(engine));
    let router = create_router(state.clone());

    (router, state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

/// 30 samples spread over [95, 105]
async fn seed_latency(app: &Router) {
    for i in 0..30 {
        let value = 95.0 + ((i * 7) % 11) as f64;
        let (status, _) = post(
            app,
            "/api/v1/metrics",
            json!({"metric": "api_latency", "value": value}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
}

#[tokio::test]
async fn test_ingest_accepts_sample() {
    let (app, _state) = setup_test_app();

    let (status, sample) = post(
        &app,
        "/api/v1/metrics",
        json!({"metric": "cpu", "value": 0.5, "timestamp": "2024-01-01T00:00:00Z"}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(sample["metric_name"], "cpu");
    assert_eq!(sample["timestamp"], "2024-01-01T00:00:00Z");
}

#[tokio::test]
async fn test_ingest_rejects_malformed_timestamp() {
    let (app, _state) = setup_test_app();

    let (status, body) = post(
        &app,
        "/api/v1/metrics",
        json!({"metric": "cpu", "value": 0.5, "timestamp": "yesterday"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("timestamp"));
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_detect_with_insufficient_history() {
    let (app, _state) = setup_test_app();

    let (status, verdict) = post(
        &app,
        "/api/v1/detect",
        json!({"metric": "fresh", "value": 1000.0}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["is_anomaly"], false);
    assert_eq!(verdict["message"], "insufficient data");
    assert!(verdict.get("methods").is_none());
}

#[tokio::test]
async fn test_detect_rejects_unknown_sensitivity() {
    let (app, _state) = setup_test_app();

    let (status, body) = post(
        &app,
        "/api/v1/detect",
        json!({"metric": "cpu", "value": 1.0, "sensitivity": "extreme"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("extreme"));
}

#[tokio::test]
async fn test_detect_then_record_latency_spike() {
    let (app, _state) = setup_test_app();
    seed_latency(&app).await;

    let (status, verdict) = post(
        &app,
        "/api/v1/detect",
        json!({"metric": "api_latency", "value": 500.0, "sensitivity": "medium"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["is_anomaly"], true);
    assert!(verdict["anomaly_count"].as_u64().unwrap() >= 4);

    let (status, record) = post(
        &app,
        "/api/v1/anomalies",
        json!({"metric": "api_latency", "value": 500.0, "verdict": verdict}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(record["id"].as_str().unwrap().starts_with("anomaly_"));
    assert_eq!(record["acknowledged"], false);

    let (status, listed) = get(&app, "/api/v1/anomalies?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_record_normal_verdict_is_no_content() {
    let (app, _state) = setup_test_app();
    seed_latency(&app).await;

    let (_, verdict) = post(
        &app,
        "/api/v1/detect",
        json!({"metric": "api_latency", "value": 100.0}),
    )
    .await;
    assert_eq!(verdict["is_anomaly"], false);

    let (status, body) = post(
        &app,
        "/api/v1/anomalies",
        json!({"metric": "api_latency", "value": 100.0, "verdict": verdict}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

#[tokio::test]
async fn test_record_recomputes_forged_verdict() {
    let (app, _state) = setup_test_app();
    seed_latency(&app).await;

    let (_, mut verdict) = post(
        &app,
        "/api/v1/detect",
        json!({"metric": "api_latency", "value": 100.0}),
    )
    .await;
    verdict["is_anomaly"] = json!(true);
    verdict["anomaly_count"] = json!(0);
    verdict["confidence"] = json!(42.0);

    let (status, _) = post(
        &app,
        "/api/v1/anomalies",
        json!({"metric": "api_latency", "value": 100.0, "verdict": verdict}),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, stats) = get(&app, "/api/v1/statistics").await;
    assert_eq!(stats["total"], 0);
}

#[tokio::test]
async fn test_out_of_range_value_is_rejected() {
    let (app, _state) = setup_test_app();

    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/v1/metrics")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"metric": "cpu", "value": 1e400}"#))
            .unwrap(),
    )
    .await;
    assert!(status.is_client_error());

    let (_, names) = get(&app, "/api/v1/metrics").await;
    assert_eq!(names["metrics"], json!([]));
}

#[tokio::test]
async fn test_huge_values_keep_verdict_finite() {
    let (app, _state) = setup_test_app();
    for _ in 0..10 {
        let (status, _) = post(
            &app,
            "/api/v1/metrics",
            json!({"metric": "m", "value": 1e308}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let (status, observation) = post(
        &app,
        "/api/v1/observe",
        json!({"metric": "m", "value": 1.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(observation["verdict"]["is_anomaly"], true);
    let deviation = &observation["verdict"]["methods"]["moving_average"]["detail"]["deviation"];
    assert!(deviation.is_f64());
}

#[tokio::test]
async fn test_metric_names_and_samples() {
    let (app, _state) = setup_test_app();
    post(
        &app,
        "/api/v1/metrics",
        json!({"metric": "mem", "value": 1.0}),
    )
    .await;
    post(
        &app,
        "/api/v1/metrics",
        json!({"metric": "cpu", "value": 2.0, "timestamp": "2024-07-01T09:00:00Z"}),
    )
    .await;

    let (status, names) = get(&app, "/api/v1/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names["metrics"], json!(["cpu", "mem"]));

    let (status, samples) = get(&app, "/api/v1/metrics/cpu/samples").await;
    assert_eq!(status, StatusCode::OK);
    let samples = samples.as_array().unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0]["value"], 2.0);
    assert_eq!(samples[0]["metric_name"], "cpu");

    let (status, empty) = get(&app, "/api/v1/metrics/disk/samples").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty, json!([]));
}

#[tokio::test]
async fn test_observe_lifecycle_and_reports() {
    let (app, _state) = setup_test_app();
    seed_latency(&app).await;

    let (status, observation) = post(
        &app,
        "/api/v1/observe",
        json!({"metric": "api_latency", "value": 500.0}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(observation["verdict"]["is_anomaly"], true);
    let id = observation["record"]["id"].as_str().unwrap().to_string();

    let (status, ack) = post(
        &app,
        &format!("/api/v1/anomalies/{}/acknowledge", id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);

    let (status, _) = post(
        &app,
        &format!("/api/v1/anomalies/{}/resolve", id),
        json!({"note": "scaled out"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, resolved) = get(&app, "/api/v1/anomalies?resolved=true").await;
    assert_eq!(resolved[0]["resolution_note"], "scaled out");
    let (_, open) = get(&app, "/api/v1/anomalies?resolved=false").await;
    assert!(open.as_array().unwrap().is_empty());

    let (status, stats) = get(&app, "/api/v1/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["resolved_count"], 1);
    assert_eq!(stats["acknowledged_count"], 1);

    let (status, report) = get(&app, "/api/v1/insights").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_anomalies"], 1);
    assert_eq!(report["insights"][0]["type"], "metric_alert");
    assert_eq!(report["insights"][0]["metric"], "api_latency");
}

#[tokio::test]
async fn test_resolve_without_body() {
    let (app, _state) = setup_test_app();
    seed_latency(&app).await;

    let (_, observation) = post(
        &app,
        "/api/v1/observe",
        json!({"metric": "api_latency", "value": 500.0}),
    )
    .await;
    let id = observation["record"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/anomalies/{}/resolve", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, resolved) = get(&app, "/api/v1/anomalies?resolved=true").await;
    assert_eq!(resolved[0]["resolution_note"], "");
}

#[tokio::test]
async fn test_unknown_anomaly_ids_return_404() {
    let (app, _state) = setup_test_app();

    let (status, body) = post(&app, "/api/v1/anomalies/unknown-id/acknowledge", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, _) = post(
        &app,
        "/api/v1/anomalies/unknown-id/resolve",
        json!({"note": "n/a"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_rejects_unknown_severity() {
    let (app, _state) = setup_test_app();
    let (status, _) = get(&app, "/api/v1/anomalies?severity=apocalyptic").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_insights_with_no_anomalies() {
    let (app, _state) = setup_test_app();

    let (status, report) = get(&app, "/api/v1/insights").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_anomalies"], 0);
    assert_eq!(report["insights"], json!([]));
}

#[tokio::test]
async fn test_rolling_window_for_reserved_metric() {
    let (app, _state) = setup_test_app();

    post(
        &app,
        "/api/v1/metrics",
        json!({"metric": "error_count", "value": 3.0}),
    )
    .await;

    let (status, window) = get(&app, "/api/v1/metrics/error_count/window").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(window["values"], json!([3.0]));

    let (status, _) = get(&app, "/api/v1/metrics/cpu/window").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app();

    let (status, health) = get(&app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["history_store"].is_object());
    assert!(health["components"]["anomaly_store"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app();

    state
        .engine
        .health()
        .set_degraded(components::HISTORY_STORE, "disk full");

    // Degraded still returns 200 (operational)
    let (status, health) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app();

    state
        .engine
        .health()
        .set_unhealthy(components::API, "Listener closed");

    let (status, health) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_ready_flag() {
    let (app, state) = setup_test_app();

    // Not ready until the agent finishes startup
    let (status, readiness) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.engine.health().set_ready(true);
    let (status, readiness) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app();
    seed_latency(&app).await;
    post(
        &app,
        "/api/v1/detect",
        json!({"metric": "api_latency", "value": 100.0}),
    )
    .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("sentinel_samples_ingested_total"));
    assert!(metrics_text.contains("sentinel_detections_total"));
    assert!(metrics_text.contains("sentinel_detection_latency_seconds_bucket"));
    assert!(metrics_text.contains("sentinel_history_samples"));
}
