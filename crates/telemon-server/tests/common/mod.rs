#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use telemon_collector::{LoadAverage, ResourceSnapshot, ResourceSource};
use telemon_health::DatabasePing;
use telemon_server::app::build_http_app;
use telemon_server::config::ServerConfig;
use telemon_server::state::AppState;
use tower::util::ServiceExt;

/// Fixed host readings.
pub struct FakeResources {
    pub memory_percent: f64,
    pub cpu_percent: f64,
}

impl ResourceSource for FakeResources {
    fn snapshot(&self) -> Result<ResourceSnapshot> {
        let total = 8 * 1024 * 1024 * 1024_u64;
        Ok(ResourceSnapshot {
            memory_used_bytes: (total as f64 * self.memory_percent / 100.0) as u64,
            memory_total_bytes: total,
            memory_percent: self.memory_percent,
            cpu_percent: self.cpu_percent,
            cpu_count: 4,
            load_average: LoadAverage {
                one: 0.5,
                five: 0.4,
                fifteen: 0.3,
            },
            uptime_secs: 3600,
        })
    }
}

/// Database ping with a fixed answer after a fixed delay.
pub struct FakeDatabase {
    pub up: bool,
    pub delay: Duration,
}

#[async_trait]
impl DatabasePing for FakeDatabase {
    async fn ping(&self) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        if self.up {
            Ok(())
        } else {
            anyhow::bail!("connection refused")
        }
    }
}

pub struct TestContext {
    pub state: AppState,
    pub app: axum::Router,
}

pub struct TestOptions {
    pub memory_percent: f64,
    pub database_up: Option<bool>,
    pub database_delay_ms: u64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            memory_percent: 40.0,
            database_up: Some(true),
            database_delay_ms: 0,
        }
    }
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.alert.seed_defaults = false;
    config.collector.enabled = false;
    config
}

pub fn build_test_context() -> TestContext {
    build_test_context_with(TestOptions::default())
}

pub fn build_test_context_with(options: TestOptions) -> TestContext {
    let resources = Arc::new(FakeResources {
        memory_percent: options.memory_percent,
        cpu_percent: 10.0,
    });
    let delay = Duration::from_millis(options.database_delay_ms);
    let database = options
        .database_up
        .map(|up| Arc::new(FakeDatabase { up, delay }) as Arc<dyn DatabasePing>);
    let state = AppState::build(test_config(), resources, database);
    let app = build_http_app(state.clone());
    TestContext { state, app }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(req_body))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await
}

pub fn assert_ok_envelope(body: &Value) {
    assert_eq!(body["err_code"], 0, "unexpected envelope: {body}");
    assert_eq!(body["err_msg"], "success");
    assert!(body["trace_id"].as_str().is_some());
}

pub fn assert_err_envelope(body: &Value, expected_code: i64) {
    assert_eq!(body["err_code"], expected_code, "unexpected envelope: {body}");
    assert!(body["err_msg"].as_str().is_some());
    assert!(body["trace_id"].as_str().is_some());
}
