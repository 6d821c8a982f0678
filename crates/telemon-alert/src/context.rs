use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use telemon_common::types::HealthStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointLatency {
    pub endpoint: String,
    pub p95_ms: f64,
}

/// What a rule saw when it fired, one variant per metric family.
///
/// Only ordered containers appear here so the serialized form, and with it
/// the suppression key, is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerContext {
    Latency {
        endpoint: String,
        p95_ms: f64,
        breaching: Vec<EndpointLatency>,
    },
    ErrorRate {
        error_rate_percent: f64,
        errors: u64,
        requests: u64,
    },
    ErrorCount {
        errors: u64,
        by_kind: BTreeMap<String, u64>,
    },
    Memory {
        used_bytes: Option<u64>,
        total_bytes: Option<u64>,
        usage_percent: f64,
    },
    Cpu {
        usage_percent: f64,
        load_average: Option<f64>,
    },
    Database {
        p95_ms: f64,
        slow_query_percent: f64,
        queries: u64,
    },
    Health {
        status: HealthStatus,
        failing_probes: Vec<String>,
    },
}

/// `rule_id:<json context>`.
///
/// # Examples
///
/// ```
/// use telemon_alert::context::{suppression_key, TriggerContext};
///
/// let ctx = TriggerContext::Cpu { usage_percent: 95.0, load_average: None };
/// let key = suppression_key("high-cpu", &ctx);
/// assert!(key.starts_with("high-cpu:{\"kind\":\"cpu\""));
/// ```
pub fn suppression_key(rule_id: &str, context: &TriggerContext) -> String {
    let rendered = serde_json::to_string(context).unwrap_or_else(|_| format!("{context:?}"));
    format!("{rule_id}:{rendered}")
}
