use crate::api::{envelope_response, error_response, internal_error, success_response, WindowParams};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use telemon_health::HealthError;

const DEFAULT_HISTORY_LIMIT: usize = 20;

fn health_error(trace_id: &str, err: HealthError) -> Response {
    match err {
        HealthError::UnknownProbe(_) => {
            error_response(StatusCode::NOT_FOUND, trace_id, "not_found", &err.to_string())
        }
        HealthError::ProcessMetadata(_) => internal_error(trace_id, &err),
    }
}

/// Fresh evaluation of every probe. 503 when the overall status is
/// critical.
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let snapshot = state.health.evaluate().await;
    if snapshot.overall_status.is_critical() {
        envelope_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &trace_id,
            crate::api::to_custom_error_code("unhealthy"),
            "service unhealthy",
            Some(snapshot),
        )
    } else {
        success_response(StatusCode::OK, &trace_id, snapshot)
    }
}

async fn ready(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let readiness = state.health.is_ready().await;
    if readiness.ready {
        success_response(StatusCode::OK, &trace_id, readiness)
    } else {
        envelope_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &trace_id,
            crate::api::to_custom_error_code("not_ready"),
            "service not ready",
            Some(readiness),
        )
    }
}

async fn alive(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.health.is_alive() {
        Ok(liveness) => success_response(StatusCode::OK, &trace_id, liveness),
        Err(e) => health_error(&trace_id, e),
    }
}

async fn status(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.health.status().await {
        Ok(report) => success_response(StatusCode::OK, &trace_id, report),
        Err(e) => health_error(&trace_id, e),
    }
}

async fn history(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let snapshots = state
        .health
        .history(params.limit_or(DEFAULT_HISTORY_LIMIT));
    success_response(StatusCode::OK, &trace_id, snapshots)
}

async fn summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.health.summary())
}

async fn service(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.health.service_health(&name).await {
        Ok(result) => success_response(StatusCode::OK, &trace_id, result),
        Err(e) => health_error(&trace_id, e),
    }
}

async fn capacity(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let capacity = state.health.can_handle_requests().await;
    success_response(StatusCode::OK, &trace_id, capacity)
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/health/ready", get(ready))
        .route("/v1/health/alive", get(alive))
        .route("/v1/health/status", get(status))
        .route("/v1/health/history", get(history))
        .route("/v1/health/summary", get(summary))
        .route("/v1/health/services/{name}", get(service))
        .route("/v1/health/capacity", get(capacity))
}
