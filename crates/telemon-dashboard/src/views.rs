use crate::trends::TrendSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use telemon_alert::AlertStatistics;
use telemon_health::HealthSnapshot;
use telemon_metrics::report::{EndpointStats, PerformanceOverview};

#[derive(Debug, Clone, Serialize)]
pub struct EndpointLatency {
    pub endpoint: String,
    pub requests: u64,
    pub mean_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertOverview {
    pub active: usize,
    /// Active alerts per severity.
    pub active_by_severity: BTreeMap<String, usize>,
    pub statistics: AlertStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// `None` for an unbounded window.
    pub window_secs: Option<i64>,
    pub generated_at: DateTime<Utc>,
    pub performance: PerformanceOverview,
    pub health: HealthSnapshot,
    pub alerts: AlertOverview,
    pub slow_endpoints: Vec<EndpointLatency>,
    pub error_endpoints: Vec<EndpointStats>,
    /// Missing when the trend source failed.
    pub trends: Option<TrendSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeMetrics {
    pub timestamp: DateTime<Utc>,
    pub requests_per_minute: f64,
    pub mean_response_ms: f64,
    pub p95_response_ms: f64,
    pub error_rate: f64,
    pub memory_percent: Option<f64>,
    pub cpu_percent: Option<f64>,
    pub active_alerts: usize,
    pub clients: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSettings {
    pub refresh_interval_secs: u64,
    pub cache_ttl_secs: u64,
    pub default_window: String,
    pub supported_windows: Vec<&'static str>,
    pub widgets: Vec<String>,
}

/// What a live-view consumer told us about itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(default)]
    pub name: Option<String>,
    /// Views the client intends to poll.
    #[serde(default)]
    pub views: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredClient {
    pub id: String,
    pub info: ClientInfo,
    pub registered_at: DateTime<Utc>,
}
