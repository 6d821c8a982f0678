use crate::condition::Condition;
use crate::evaluators;
use crate::model::{EscalationAction, EscalationStep, PolicySpec, RuleSpec};
use telemon_common::types::Severity;

pub const STANDARD_POLICY: &str = "standard";
pub const URGENT_POLICY: &str = "urgent";

/// Built-in rule definitions seeded at startup.
struct RuleDef {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    metric_type: &'static str,
    severity: Severity,
    condition: Condition,
    threshold: f64,
    policy: &'static str,
}

const DEFAULT_RULES: &[RuleDef] = &[
    // ---- API ----
    RuleDef {
        id: "high-api-latency",
        name: "High API response time",
        description: "p95 latency of an endpoint above 2s",
        metric_type: evaluators::API_RESPONSE_TIME,
        severity: Severity::Warning,
        condition: Condition::GreaterThan,
        threshold: 2_000.0,
        policy: STANDARD_POLICY,
    },
    RuleDef {
        id: "high-error-rate",
        name: "High API error rate",
        description: "More than 5% of requests failed",
        metric_type: evaluators::ERROR_RATE,
        severity: Severity::Critical,
        condition: Condition::GreaterThan,
        threshold: 5.0,
        policy: URGENT_POLICY,
    },
    RuleDef {
        id: "error-burst",
        name: "Error burst",
        description: "More than 50 recorded errors",
        metric_type: evaluators::ERROR_COUNT,
        severity: Severity::Warning,
        condition: Condition::GreaterThan,
        threshold: 50.0,
        policy: STANDARD_POLICY,
    },
    // ---- Resources ----
    RuleDef {
        id: "high-memory-usage",
        name: "High memory usage",
        description: "Memory usage above 90%",
        metric_type: evaluators::MEMORY_USAGE,
        severity: Severity::Critical,
        condition: Condition::GreaterThan,
        threshold: 90.0,
        policy: URGENT_POLICY,
    },
    RuleDef {
        id: "high-cpu-usage",
        name: "High CPU usage",
        description: "CPU usage above 90%",
        metric_type: evaluators::CPU_USAGE,
        severity: Severity::Warning,
        condition: Condition::GreaterThan,
        threshold: 90.0,
        policy: STANDARD_POLICY,
    },
    // ---- Database ----
    RuleDef {
        id: "slow-database",
        name: "Slow database",
        description: "p95 query time above 1s",
        metric_type: evaluators::DATABASE_RESPONSE_TIME,
        severity: Severity::Warning,
        condition: Condition::GreaterThan,
        threshold: 1_000.0,
        policy: STANDARD_POLICY,
    },
    RuleDef {
        id: "slow-query-rate",
        name: "Slow query share",
        description: "More than 10% of queries are slow",
        metric_type: evaluators::SLOW_QUERY_RATE,
        severity: Severity::Critical,
        condition: Condition::GreaterThan,
        threshold: 10.0,
        policy: URGENT_POLICY,
    },
    // ---- Health ----
    RuleDef {
        id: "health-critical",
        name: "System health critical",
        description: "Overall health evaluated as critical",
        metric_type: evaluators::HEALTH_STATUS,
        severity: Severity::Critical,
        condition: Condition::GreaterEqual,
        threshold: 2.0,
        policy: URGENT_POLICY,
    },
];

pub fn default_policies() -> Vec<PolicySpec> {
    use EscalationAction::*;

    let step = |delay_secs: u64, actions: &[EscalationAction]| EscalationStep {
        delay_secs,
        actions: actions.iter().copied().collect(),
    };
    vec![
        PolicySpec {
            id: Some(STANDARD_POLICY.to_string()),
            name: "Standard escalation".to_string(),
            steps: vec![step(0, &[Log]), step(900, &[Notify])],
        },
        PolicySpec {
            id: Some(URGENT_POLICY.to_string()),
            name: "Urgent escalation".to_string(),
            steps: vec![
                step(0, &[Log, Notify]),
                step(300, &[Repeat, Notify]),
                step(900, &[EscalateToAdmin]),
            ],
        },
    ]
}

pub fn default_rules() -> Vec<RuleSpec> {
    DEFAULT_RULES
        .iter()
        .map(|def| RuleSpec {
            id: Some(def.id.to_string()),
            name: def.name.to_string(),
            description: def.description.to_string(),
            metric_type: def.metric_type.to_string(),
            severity: def.severity,
            threshold: def.threshold,
            condition: def.condition,
            enabled: true,
            escalation_policy_id: Some(def.policy.to_string()),
        })
        .collect()
}
