use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Per-series sample bound; the oldest sample is dropped first.
    #[serde(default = "default_max_samples_per_series")]
    pub max_samples_per_series: usize,
    /// Samples older than this are dropped by the eviction sweep.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Database queries slower than this count as slow.
    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: f64,
    /// API requests slower than this show up in slow-request reports.
    #[serde(default = "default_slow_request_threshold_ms")]
    pub slow_request_threshold_ms: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_samples_per_series: default_max_samples_per_series(),
            retention_secs: default_retention_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
            slow_request_threshold_ms: default_slow_request_threshold_ms(),
        }
    }
}

fn default_max_samples_per_series() -> usize {
    10_000
}

fn default_retention_secs() -> u64 {
    86_400
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_slow_query_threshold_ms() -> f64 {
    1_000.0
}

fn default_slow_request_threshold_ms() -> f64 {
    1_000.0
}
