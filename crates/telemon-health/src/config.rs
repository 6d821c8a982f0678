use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Snapshots kept in the rolling history.
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Upper bound for a single probe run.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Critical above this usage percent; warning above
    /// `threshold * warning_ratio`.
    #[serde(default = "default_usage_threshold")]
    pub memory_threshold_percent: f64,
    #[serde(default = "default_usage_threshold")]
    pub cpu_threshold_percent: f64,
    #[serde(default = "default_warning_ratio")]
    pub warning_ratio: f64,
    #[serde(default = "default_db_response_warning_ms")]
    pub db_response_warning_ms: f64,
    #[serde(default = "default_slow_query_critical_percent")]
    pub slow_query_critical_percent: f64,
    /// Lookback used for database query statistics.
    #[serde(default = "default_db_stats_window_secs")]
    pub db_stats_window_secs: u64,
    /// Paths the process must be able to write to.
    #[serde(default)]
    pub writable_paths: Vec<PathBuf>,
    /// Probes reported as disabled without running.
    #[serde(default)]
    pub disabled_probes: Vec<String>,
    #[serde(default)]
    pub integrations: Vec<IntegrationConfig>,
}

/// An external integration and the environment it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub required_env: Vec<String>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            probe_timeout_secs: default_probe_timeout_secs(),
            memory_threshold_percent: default_usage_threshold(),
            cpu_threshold_percent: default_usage_threshold(),
            warning_ratio: default_warning_ratio(),
            db_response_warning_ms: default_db_response_warning_ms(),
            slow_query_critical_percent: default_slow_query_critical_percent(),
            db_stats_window_secs: default_db_stats_window_secs(),
            writable_paths: Vec::new(),
            disabled_probes: Vec::new(),
            integrations: Vec::new(),
        }
    }
}

fn default_history_size() -> usize {
    100
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_usage_threshold() -> f64 {
    90.0
}

fn default_warning_ratio() -> f64 {
    0.8
}

fn default_db_response_warning_ms() -> f64 {
    1_000.0
}

fn default_slow_query_critical_percent() -> f64 {
    10.0
}

fn default_db_stats_window_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}
