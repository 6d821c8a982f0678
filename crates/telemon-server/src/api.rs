pub mod alerts;
pub mod dashboard;
pub mod health;
pub mod metrics;

use crate::state::AppState;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use telemon_common::window::window_or;

/// Unified response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 0 on success.
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
    pub data: Option<T>,
}

pub fn envelope_response<T>(
    status: StatusCode,
    trace_id: &str,
    err_code: i32,
    msg: &str,
    data: Option<T>,
) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data,
        }),
    )
        .into_response()
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    envelope_response(status, trace_id, 0, "success", Some(data))
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    envelope_response::<Value>(status, trace_id, 0, msg, None)
}

pub fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "internal_error" => 1500,
        "unhealthy" => 1503,
        "not_ready" => 1504,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    envelope_response::<Value>(status, trace_id, to_custom_error_code(code), msg, None)
}

/// 500 with a generic message; the cause only goes to the log.
pub fn internal_error(trace_id: &str, error: &dyn std::fmt::Display) -> Response {
    tracing::error!(trace_id, error = %error, "Request failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        trace_id,
        "internal_error",
        "internal server error",
    )
}

/// Query parameters shared by the read endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub window: Option<String>,
    pub limit: Option<usize>,
}

impl WindowParams {
    /// Parsed window, or `default` when absent or malformed.
    pub fn window_or(&self, default: Duration) -> Duration {
        window_or(self.window.as_deref(), default)
    }

    pub fn limit_or(&self, default: usize) -> usize {
        self.limit.unwrap_or(default)
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(metrics::metrics_routes())
        .merge(health::health_routes())
        .merge(alerts::alert_routes())
        .merge(dashboard::dashboard_routes())
}
