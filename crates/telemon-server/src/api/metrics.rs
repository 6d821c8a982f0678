use crate::api::{error_response, success_empty_response, success_response, WindowParams};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::Duration;
use serde::Deserialize;

const DEFAULT_LIMIT: usize = 10;

fn default_window() -> Duration {
    Duration::hours(1)
}

async fn store_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let stats = state.metrics.stats(params.window_or(default_window()));
    success_response(StatusCode::OK, &trace_id, stats)
}

async fn slow_queries(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let queries = state.metrics.slow_queries(
        params.limit_or(DEFAULT_LIMIT),
        params.window_or(default_window()),
    );
    success_response(StatusCode::OK, &trace_id, queries)
}

async fn reset_metrics(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    state.metrics.reset();
    tracing::info!(trace_id = trace_id.0.as_str(), "Metrics store reset");
    success_empty_response(StatusCode::OK, &trace_id, "metrics reset")
}

async fn performance(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let overview = state
        .metrics
        .performance_overview(params.window_or(Duration::minutes(5)));
    success_response(StatusCode::OK, &trace_id, overview)
}

async fn api_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let stats = state.metrics.api_stats(params.window_or(default_window()));
    success_response(StatusCode::OK, &trace_id, stats)
}

async fn slow_requests(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let requests = state.metrics.slow_requests(
        params.limit_or(DEFAULT_LIMIT),
        params.window_or(default_window()),
    );
    success_response(StatusCode::OK, &trace_id, requests)
}

#[derive(Debug, Deserialize)]
struct EndpointParams {
    endpoint: Option<String>,
    window: Option<String>,
}

async fn endpoint_report(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<EndpointParams>,
) -> impl IntoResponse {
    let Some(endpoint) = params.endpoint.filter(|e| !e.trim().is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "endpoint query parameter is required",
        );
    };
    let window = telemon_common::window::window_or(params.window.as_deref(), default_window());
    match state.metrics.endpoint_report(&endpoint, window) {
        Some(report) => success_response(StatusCode::OK, &trace_id, report),
        None => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("no samples for endpoint {endpoint}"),
        ),
    }
}

async fn error_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let stats = state.metrics.error_stats(params.window_or(default_window()));
    success_response(StatusCode::OK, &trace_id, stats)
}

pub fn metrics_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/metrics/stats", get(store_stats))
        .route("/v1/metrics/slow-queries", get(slow_queries))
        .route("/v1/metrics/reset", post(reset_metrics))
        .route("/v1/metrics/performance", get(performance))
        .route("/v1/metrics/api", get(api_stats))
        .route("/v1/metrics/slow-requests", get(slow_requests))
        .route("/v1/metrics/endpoint", get(endpoint_report))
        .route("/v1/metrics/errors", get(error_stats))
}
