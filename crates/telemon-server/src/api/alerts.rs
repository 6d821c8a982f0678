use crate::api::{error_response, success_response, WindowParams};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use telemon_alert::{AlertError, PolicySpec, RuleSpec};
use telemon_common::types::Severity;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_ACTOR: &str = "api";

fn alert_error(trace_id: &str, err: AlertError) -> Response {
    let (status, code) = match &err {
        AlertError::RuleNotFound(_)
        | AlertError::PolicyNotFound(_)
        | AlertError::AlertNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        AlertError::DuplicateRule(_)
        | AlertError::DuplicatePolicy(_)
        | AlertError::InvalidTransition { .. }
        | AlertError::PolicyInUse(_) => (StatusCode::CONFLICT, "conflict"),
        AlertError::InvalidRule(_)
        | AlertError::InvalidPolicy(_)
        | AlertError::UnknownMetricType(_) => (StatusCode::BAD_REQUEST, "bad_request"),
    };
    error_response(status, trace_id, code, &err.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct AlertQuery {
    severity: Option<String>,
    limit: Option<usize>,
}

impl AlertQuery {
    /// `Ok(None)` when no severity filter was given.
    fn severity(&self) -> Result<Option<Severity>, String> {
        match self.severity.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<Severity>()
                .map(Some)
                .map_err(|_| format!("unknown severity: {raw}")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ActorRequest {
    #[serde(default)]
    actor: Option<String>,
}

/// Actor from an optional JSON body.
fn actor_from(body: &Bytes) -> String {
    serde_json::from_slice::<ActorRequest>(body)
        .ok()
        .and_then(|req| req.actor)
        .filter(|actor| !actor.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ACTOR.to_string())
}

#[derive(Serialize)]
struct MetricTypesResponse {
    metric_types: Vec<String>,
}

// ---- Rules ----

async fn list_rules(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.alerts.rules())
}

async fn create_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(spec): Json<RuleSpec>,
) -> impl IntoResponse {
    match state.alerts.add_rule(spec) {
        Ok(rule) => success_response(StatusCode::CREATED, &trace_id, rule),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn get_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.alerts.rule(&id) {
        Ok(rule) => success_response(StatusCode::OK, &trace_id, rule),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn update_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(spec): Json<RuleSpec>,
) -> impl IntoResponse {
    match state.alerts.update_rule(&id, spec) {
        Ok(rule) => success_response(StatusCode::OK, &trace_id, rule),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn delete_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.alerts.delete_rule(&id) {
        Ok(rule) => success_response(StatusCode::OK, &trace_id, rule),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn metric_types(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(
        StatusCode::OK,
        &trace_id,
        MetricTypesResponse {
            metric_types: state.alerts.metric_types(),
        },
    )
}

// ---- Policies ----

async fn list_policies(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, state.alerts.policies())
}

async fn create_policy(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(spec): Json<PolicySpec>,
) -> impl IntoResponse {
    match state.alerts.add_policy(spec) {
        Ok(policy) => success_response(StatusCode::CREATED, &trace_id, policy),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn get_policy(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.alerts.policy(&id) {
        Ok(policy) => success_response(StatusCode::OK, &trace_id, policy),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn update_policy(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(spec): Json<PolicySpec>,
) -> impl IntoResponse {
    match state.alerts.update_policy(&id, spec) {
        Ok(policy) => success_response(StatusCode::OK, &trace_id, policy),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn delete_policy(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.alerts.delete_policy(&id) {
        Ok(policy) => success_response(StatusCode::OK, &trace_id, policy),
        Err(e) => alert_error(&trace_id, e),
    }
}

// ---- Alerts ----

async fn active_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> impl IntoResponse {
    match query.severity() {
        Ok(severity) => {
            success_response(StatusCode::OK, &trace_id, state.alerts.active_alerts(severity))
        }
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg),
    }
}

async fn alert_history(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    match query.severity() {
        Ok(severity) => success_response(
            StatusCode::OK,
            &trace_id,
            state.alerts.alert_history(limit, severity),
        ),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg),
    }
}

async fn alert_statistics(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> impl IntoResponse {
    let stats = state
        .alerts
        .alert_statistics(params.window_or(Duration::hours(24)));
    success_response(StatusCode::OK, &trace_id, stats)
}

async fn acknowledge_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    match state.alerts.acknowledge(&id, &actor_from(&body)) {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, alert),
        Err(e) => alert_error(&trace_id, e),
    }
}

async fn resolve_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    match state.alerts.resolve(&id, &actor_from(&body)) {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, alert),
        Err(e) => alert_error(&trace_id, e),
    }
}

pub fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/alerts/rules", get(list_rules).post(create_rule))
        .route(
            "/v1/alerts/rules/{id}",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/v1/alerts/metric-types", get(metric_types))
        .route("/v1/alerts/policies", get(list_policies).post(create_policy))
        .route(
            "/v1/alerts/policies/{id}",
            get(get_policy).put(update_policy).delete(delete_policy),
        )
        .route("/v1/alerts/active", get(active_alerts))
        .route("/v1/alerts/history", get(alert_history))
        .route("/v1/alerts/statistics", get(alert_statistics))
        .route("/v1/alerts/{id}/acknowledge", post(acknowledge_alert))
        .route("/v1/alerts/{id}/resolve", post(resolve_alert))
}
