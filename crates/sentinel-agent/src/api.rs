//! HTTP API for the anomaly engine plus health checks and Prometheus metrics

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use sentinel_lib::{
    health::ComponentStatus, AnomalyFilter, DetectionVerdict, EngineError, SentinelEngine,
    Sensitivity, Severity,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SentinelEngine>,
}

impl AppState {
    pub fn new(engine: Arc<SentinelEngine>) -> Self {
        Self { engine }
    }

    /// Run an engine call on the blocking pool; store writes touch the disk
    async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&SentinelEngine) -> T + Send + 'static,
        T: Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || f(&engine))
            .await
            .map_err(|e| {
                error!(error = %e, "Engine task failed");
                ApiError::internal("engine task failed")
            })
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                code: Some(code.to_string()),
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn validate_metric(metric: &str) -> Result<(), ApiError> {
    if metric.trim().is_empty() {
        return Err(ApiError::bad_request("metric name must not be empty"));
    }
    Ok(())
}

fn parse_sensitivity(state: &AppState, raw: Option<&str>) -> Result<Sensitivity, ApiError> {
    match raw {
        Some(raw) => raw
            .parse::<Sensitivity>()
            .map_err(|e| ApiError::bad_request(e.to_string())),
        None => Ok(state.engine.default_sensitivity()),
    }
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub metric: String,
    pub value: f64,
    /// RFC 3339; stamped by the engine when absent
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub sensitivity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordRequest {
    pub metric: String,
    pub value: f64,
    pub verdict: DetectionVerdict,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub severity: Option<String>,
    pub resolved: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LifecycleResponse {
    pub id: String,
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricNamesResponse {
    pub metrics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WindowResponse {
    pub metric: String,
    pub values: Vec<f64>,
}

async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_metric(&request.metric)?;
    let timestamp = request
        .timestamp
        .as_deref()
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| ApiError::bad_request(format!("invalid timestamp '{}': {}", raw, e)))
        })
        .transpose()?;

    let sample = state
        .run(move |engine| engine.ingest(&request.metric, request.value, timestamp))
        .await??;
    Ok((StatusCode::ACCEPTED, Json(sample)))
}

async fn detect(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_metric(&request.metric)?;
    let sensitivity = parse_sensitivity(&state, request.sensitivity.as_deref())?;

    let verdict = state
        .run(move |engine| engine.detect(&request.metric, request.value, sensitivity))
        .await??;
    Ok(Json(verdict))
}

async fn observe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DetectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_metric(&request.metric)?;
    let sensitivity = parse_sensitivity(&state, request.sensitivity.as_deref())?;

    let observation = state
        .run(move |engine| engine.observe(&request.metric, request.value, sensitivity))
        .await??;
    Ok(Json(observation))
}

async fn record(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordRequest>,
) -> Result<Response, ApiError> {
    validate_metric(&request.metric)?;
    let record = state
        .run(move |engine| engine.record(&request.metric, request.value, &request.verdict))
        .await??;

    Ok(match record {
        Some(record) => (StatusCode::CREATED, Json(record)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn list_anomalies(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let severity = query
        .severity
        .as_deref()
        .map(|raw| raw.parse::<Severity>().map_err(ApiError::bad_request))
        .transpose()?;
    let filter = AnomalyFilter {
        limit: query.limit.unwrap_or(AnomalyFilter::default().limit),
        severity,
        resolved: query.resolved,
    };

    let records = state.run(move |engine| engine.list_anomalies(&filter)).await?;
    Ok(Json(records))
}

async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let found = state.run(move |engine| engine.acknowledge(&lookup)).await?;
    if !found {
        return Err(ApiError::not_found(format!("anomaly '{}' not found", id)));
    }
    Ok(Json(LifecycleResponse { id, success: true }))
}

async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: ResolveRequest = if body.is_empty() {
        ResolveRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid resolve body: {}", e)))?
    };

    let lookup = id.clone();
    let found = state
        .run(move |engine| engine.resolve(&lookup, &request.note))
        .await?;
    if !found {
        return Err(ApiError::not_found(format!("anomaly '{}' not found", id)));
    }
    Ok(Json(LifecycleResponse { id, success: true }))
}

async fn insights(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.run(|engine| engine.insights()).await?))
}

async fn statistics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.run(|engine| engine.statistics()).await?))
}

async fn metric_names(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let metrics = state.run(|engine| engine.metric_names()).await?;
    Ok(Json(MetricNamesResponse { metrics }))
}

/// Stored samples for one metric, oldest first; empty for unknown metrics
async fn samples(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.run(move |engine| engine.samples(&metric)).await?))
}

async fn rolling_window(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.engine.rolling_window(&metric) {
        Some(values) => Ok(Json(WindowResponse { metric, values })),
        None => Err(ApiError::not_found(format!(
            "metric '{}' has no rolling window",
            metric
        ))),
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.engine.health().health();

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.engine.health().readiness();

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/metrics", get(metric_names).post(ingest))
        .route("/api/v1/metrics/:metric/samples", get(samples))
        .route("/api/v1/metrics/:metric/window", get(rolling_window))
        .route("/api/v1/detect", post(detect))
        .route("/api/v1/observe", post(observe))
        .route("/api/v1/anomalies", get(list_anomalies).post(record))
        .route("/api/v1/anomalies/:id/acknowledge", post(acknowledge))
        .route("/api/v1/anomalies/:id/resolve", post(resolve))
        .route("/api/v1/insights", get(insights))
        .route("/api/v1/statistics", get(statistics))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
