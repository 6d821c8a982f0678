use crate::condition::Condition;
use crate::context::TriggerContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use telemon_common::types::Severity;

/// A declarative alert rule as held by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub metric_type: String,
    pub severity: Severity,
    pub threshold: f64,
    pub condition: Condition,
    pub enabled: bool,
    pub escalation_policy_id: Option<String>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields of a rule, used for both add and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Generated when absent on add; ignored on update.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub metric_type: String,
    pub severity: Severity,
    pub threshold: f64,
    pub condition: Condition,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub escalation_policy_id: Option<String>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Acknowledged => write!(f, "acknowledged"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub rule_name: String,
    pub metric_type: String,
    pub severity: Severity,
    pub value: f64,
    pub threshold: f64,
    pub condition: Condition,
    pub context: TriggerContext,
    pub message: String,
    pub status: AlertStatus,
    /// Number of escalation steps that have fired.
    pub escalation_step: usize,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    Log,
    Notify,
    Repeat,
    EscalateToAdmin,
}

impl std::fmt::Display for EscalationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationAction::Log => write!(f, "log"),
            EscalationAction::Notify => write!(f, "notify"),
            EscalationAction::Repeat => write!(f, "repeat"),
            EscalationAction::EscalateToAdmin => write!(f, "escalate_to_admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationStep {
    /// Seconds after alert creation.
    pub delay_secs: u64,
    pub actions: BTreeSet<EscalationAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscalationPolicy {
    pub id: String,
    pub name: String,
    pub steps: Vec<EscalationStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySpec {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub steps: Vec<EscalationStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Triggered,
    Escalated,
    Acknowledged,
    Resolved,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertHistoryEntry {
    pub alert: Alert,
    pub action: HistoryAction,
    pub actor: Option<String>,
    pub timestamp: DateTime<Utc>,
}
