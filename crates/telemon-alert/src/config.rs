use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_evaluation_interval_secs")]
    pub evaluation_interval_secs: u64,
    /// Lookback every rule is evaluated over.
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,
    #[serde(default = "default_suppression_secs")]
    pub suppression_secs: u64,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_history_retention_days")]
    pub history_retention_days: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Seed the built-in rules and escalation policies at startup.
    #[serde(default = "default_true")]
    pub seed_defaults: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: default_evaluation_interval_secs(),
            lookback_secs: default_lookback_secs(),
            suppression_secs: default_suppression_secs(),
            history_capacity: default_history_capacity(),
            history_retention_days: default_history_retention_days(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            seed_defaults: true,
        }
    }
}

fn default_evaluation_interval_secs() -> u64 {
    30
}

fn default_lookback_secs() -> u64 {
    300
}

fn default_suppression_secs() -> u64 {
    300
}

fn default_history_capacity() -> usize {
    1_000
}

fn default_history_retention_days() -> u64 {
    7
}

fn default_cleanup_interval_secs() -> u64 {
    3_600
}

fn default_true() -> bool {
    true
}
