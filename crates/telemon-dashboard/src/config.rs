use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_cache_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,
    /// Suggested client polling interval, reported by the config view.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_window")]
    pub default_window: String,
    /// Entries in the slow and failing endpoint lists.
    #[serde(default = "default_top_endpoints")]
    pub top_endpoints: usize,
    #[serde(default = "default_widgets")]
    pub widgets: Vec<String>,
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_cache_sweep_interval_secs() -> u64 {
    60
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_window() -> String {
    "1h".to_string()
}

fn default_top_endpoints() -> usize {
    5
}

fn default_widgets() -> Vec<String> {
    [
        "performance",
        "health",
        "alerts",
        "slow_endpoints",
        "error_endpoints",
        "trends",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_sweep_interval_secs: default_cache_sweep_interval_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            default_window: default_window(),
            top_endpoints: default_top_endpoints(),
            widgets: default_widgets(),
        }
    }
}
