use serde::{Deserialize, Serialize};
use telemon_alert::AlertConfig;
use telemon_dashboard::DashboardConfig;
use telemon_health::HealthConfig;
use telemon_metrics::MetricsConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Empty allows any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
}

/// Target of the database liveness ping. Without an address the database
/// probe reports itself disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `host:port`
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            address: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_collector_enabled")]
    pub enabled: bool,
    #[serde(default = "default_sample_interval_secs")]
    pub sample_interval_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: default_collector_enabled(),
            sample_interval_secs: default_sample_interval_secs(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

/// Above the health check's slow-ping warning line and below its probe
/// timeout, so a slow but reachable database grades as a warning.
fn default_connect_timeout_ms() -> u64 {
    3000
}

fn default_collector_enabled() -> bool {
    true
}

fn default_sample_interval_secs() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            http_port: default_http_port(),
            cors_allowed_origins: Vec::new(),
            database: DatabaseConfig::default(),
            metrics: MetricsConfig::default(),
            health: HealthConfig::default(),
            alert: AlertConfig::default(),
            dashboard: DashboardConfig::default(),
            collector: CollectorConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
