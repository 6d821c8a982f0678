use crate::api::{error_response, success_response, WindowParams};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use telemon_common::window::window_or;
use telemon_dashboard::{ClientInfo, DashboardError};

fn dashboard_error(trace_id: &str, err: DashboardError) -> Response {
    match err {
        DashboardError::ClientNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, trace_id, "not_found", &err.to_string())
        }
        DashboardError::InvalidClient(_) => {
            error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", &err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterClientRequest {
    id: String,
    #[serde(flatten)]
    info: ClientInfo,
}

#[derive(Serialize)]
struct CacheClearResponse {
    removed: usize,
}

async fn dashboard(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let fallback = window_or(
        Some(state.dashboard.config().default_window.as_str()),
        Duration::hours(1),
    );
    let view = state.dashboard.dashboard(params.window_or(fallback)).await;
    success_response(StatusCode::OK, &trace_id, view.as_ref())
}

async fn realtime(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let view = state.dashboard.realtime_metrics();
    success_response(StatusCode::OK, &trace_id, view.as_ref())
}

async fn dashboard_config(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.dashboard.dashboard_config())
}

async fn list_clients(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.dashboard.clients())
}

async fn register_client(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<RegisterClientRequest>,
) -> impl IntoResponse {
    match state.dashboard.register_client(&req.id, req.info) {
        Ok(client) => success_response(StatusCode::CREATED, &trace_id, client),
        Err(e) => dashboard_error(&trace_id, e),
    }
}

async fn unregister_client(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.dashboard.unregister_client(&id) {
        Ok(client) => success_response(StatusCode::OK, &trace_id, client),
        Err(e) => dashboard_error(&trace_id, e),
    }
}

async fn clear_cache(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let removed = state.dashboard.clear_cache();
    success_response(StatusCode::OK, &trace_id, CacheClearResponse { removed })
}

async fn cache_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.dashboard.cache_stats())
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/dashboard", get(dashboard))
        .route("/v1/dashboard/realtime", get(realtime))
        .route("/v1/dashboard/config", get(dashboard_config))
        .route(
            "/v1/dashboard/clients",
            get(list_clients).post(register_client),
        )
        .route("/v1/dashboard/clients/{id}", delete(unregister_client))
        .route("/v1/dashboard/cache", get(cache_stats))
        .route("/v1/dashboard/cache/clear", post(clear_cache))
}
