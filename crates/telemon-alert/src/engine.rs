use crate::condition::evaluate_condition;
use crate::config::AlertConfig;
use crate::context::suppression_key;
use crate::error::{AlertError, Result};
use crate::escalation::{ActionHandler, EscalationTasks};
use crate::evaluators::{EvalInput, EvaluatorRegistry, Observation};
use crate::model::{
    Alert, AlertHistoryEntry, AlertRule, AlertStatus, EscalationPolicy, HistoryAction, PolicySpec,
    RuleSpec,
};
use crate::seed;
use crate::stats::AlertStatistics;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use telemon_common::id::next_prefixed;
use telemon_common::ring::BoundedRing;
use telemon_common::types::Severity;
use telemon_common::window;
use tokio::time::Instant;

/// Longest accepted delay for an escalation step (30 days).
pub const MAX_STEP_DELAY_SECS: u64 = 30 * 24 * 3600;

/// Registry of rules and escalation policies plus the alert lifecycle.
///
/// Every mutation of rules, policies, active alerts, suppression entries
/// and history happens under one lock, so transitions are atomic with
/// respect to evaluation ticks and administrative calls. Rule conditions
/// are evaluated without holding it.
pub struct AlertEngine {
    shared: Arc<Shared>,
}

struct Shared {
    config: AlertConfig,
    registry: EvaluatorRegistry,
    handler: Arc<dyn ActionHandler>,
    state: Mutex<EngineState>,
    escalations: EscalationTasks,
}

struct EngineState {
    rules: Vec<AlertRule>,
    policies: Vec<EscalationPolicy>,
    active: HashMap<String, Alert>,
    /// Suppression key to expiry.
    suppression: HashMap<String, DateTime<Utc>>,
    history: BoundedRing<AlertHistoryEntry>,
}

impl EngineState {
    fn record(
        &mut self,
        alert: Alert,
        action: HistoryAction,
        actor: Option<&str>,
        at: DateTime<Utc>,
    ) {
        self.history.push(AlertHistoryEntry {
            alert,
            action,
            actor: actor.map(str::to_string),
            timestamp: at,
        });
    }

    /// Error for an id missing from the active set: resolved alerts still
    /// in history are a transition error, everything else is unknown.
    fn missing_alert(&self, id: &str, action: &'static str) -> AlertError {
        if self.history.iter().any(|e| e.alert.id == id) {
            AlertError::InvalidTransition {
                id: id.to_string(),
                action,
                status: AlertStatus::Resolved.to_string(),
            }
        } else {
            AlertError::AlertNotFound(id.to_string())
        }
    }

    fn acknowledge(&mut self, id: &str, actor: &str, now: DateTime<Utc>) -> Result<Alert> {
        let Some(alert) = self.active.get_mut(id) else {
            return Err(self.missing_alert(id, "acknowledged"));
        };
        if alert.status != AlertStatus::Active {
            return Err(AlertError::InvalidTransition {
                id: id.to_string(),
                action: "acknowledged",
                status: alert.status.to_string(),
            });
        }
        alert.status = AlertStatus::Acknowledged;
        alert.acknowledged_at = Some(now);
        alert.acknowledged_by = Some(actor.to_string());
        let snapshot = alert.clone();
        self.record(snapshot.clone(), HistoryAction::Acknowledged, Some(actor), now);
        Ok(snapshot)
    }

    fn resolve(&mut self, id: &str, actor: &str, now: DateTime<Utc>) -> Result<Alert> {
        let Some(mut alert) = self.active.remove(id) else {
            return Err(self.missing_alert(id, "resolved"));
        };
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(now);
        alert.resolved_by = Some(actor.to_string());
        self.record(alert.clone(), HistoryAction::Resolved, Some(actor), now);
        Ok(alert)
    }

    fn policy_exists(&self, id: &str) -> bool {
        self.policies.iter().any(|p| p.id == id)
    }
}

impl AlertEngine {
    pub fn new(
        config: AlertConfig,
        registry: EvaluatorRegistry,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        let state = EngineState {
            rules: Vec::new(),
            policies: Vec::new(),
            active: HashMap::new(),
            suppression: HashMap::new(),
            history: BoundedRing::new(config.history_capacity),
        };
        let seed_defaults = config.seed_defaults;
        let engine = Self {
            shared: Arc::new(Shared {
                config,
                registry,
                handler,
                state: Mutex::new(state),
                escalations: EscalationTasks::default(),
            }),
        };
        if seed_defaults {
            engine.seed_defaults();
        }
        engine
    }

    fn seed_defaults(&self) {
        for policy in seed::default_policies() {
            if let Err(e) = self.add_policy(policy) {
                tracing::warn!(error = %e, "Skipping default escalation policy");
            }
        }
        let mut seeded = 0;
        for rule in seed::default_rules() {
            if !self.shared.registry.contains(&rule.metric_type) {
                tracing::debug!(
                    metric_type = %rule.metric_type,
                    "Metric type not registered, default rule skipped"
                );
                continue;
            }
            match self.add_rule(rule) {
                Ok(_) => seeded += 1,
                Err(e) => tracing::warn!(error = %e, "Skipping default alert rule"),
            }
        }
        tracing::info!(rules = seeded, "Default alert rules seeded");
    }

    pub fn config(&self) -> &AlertConfig {
        &self.shared.config
    }

    pub fn metric_types(&self) -> Vec<String> {
        self.shared.registry.metric_types()
    }

    // ---- Rules ----

    fn validate_rule(&self, spec: &RuleSpec, state: &EngineState) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(AlertError::InvalidRule("name must not be empty".into()));
        }
        if !spec.threshold.is_finite() {
            return Err(AlertError::InvalidRule("threshold must be a finite number".into()));
        }
        if !self.shared.registry.contains(&spec.metric_type) {
            return Err(AlertError::UnknownMetricType(spec.metric_type.clone()));
        }
        if let Some(policy_id) = &spec.escalation_policy_id {
            if !state.policy_exists(policy_id) {
                return Err(AlertError::InvalidRule(format!(
                    "escalation policy {policy_id} does not exist"
                )));
            }
        }
        Ok(())
    }

    pub fn add_rule(&self, spec: RuleSpec) -> Result<AlertRule> {
        let mut state = self.shared.state.lock();
        self.validate_rule(&spec, &state)?;

        let id = spec
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| next_prefixed("rule"));
        if state.rules.iter().any(|r| r.id == id) {
            return Err(AlertError::DuplicateRule(id));
        }

        let now = Utc::now();
        let rule = AlertRule {
            id,
            name: spec.name,
            description: spec.description,
            metric_type: spec.metric_type,
            severity: spec.severity,
            threshold: spec.threshold,
            condition: spec.condition,
            enabled: spec.enabled,
            escalation_policy_id: spec.escalation_policy_id,
            last_triggered_at: None,
            trigger_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.rules.push(rule.clone());
        tracing::info!(rule_id = %rule.id, metric_type = %rule.metric_type, "Alert rule added");
        Ok(rule)
    }

    pub fn update_rule(&self, id: &str, spec: RuleSpec) -> Result<AlertRule> {
        let mut state = self.shared.state.lock();
        if !state.rules.iter().any(|r| r.id == id) {
            return Err(AlertError::RuleNotFound(id.to_string()));
        }
        self.validate_rule(&spec, &state)?;

        let rule = state
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;
        rule.name = spec.name;
        rule.description = spec.description;
        rule.metric_type = spec.metric_type;
        rule.severity = spec.severity;
        rule.threshold = spec.threshold;
        rule.condition = spec.condition;
        rule.enabled = spec.enabled;
        rule.escalation_policy_id = spec.escalation_policy_id;
        rule.updated_at = Utc::now();
        let updated = rule.clone();
        tracing::info!(rule_id = %id, "Alert rule updated");
        Ok(updated)
    }

    /// Remove a rule and its suppression entries. Alerts it already raised
    /// stay in place.
    pub fn delete_rule(&self, id: &str) -> Result<AlertRule> {
        let mut state = self.shared.state.lock();
        let index = state
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;
        let rule = state.rules.remove(index);
        let prefix = format!("{id}:");
        state.suppression.retain(|key, _| !key.starts_with(&prefix));
        tracing::info!(rule_id = %id, "Alert rule deleted");
        Ok(rule)
    }

    /// All rules in registration order.
    pub fn rules(&self) -> Vec<AlertRule> {
        self.shared.state.lock().rules.clone()
    }

    pub fn rule(&self, id: &str) -> Result<AlertRule> {
        self.shared
            .state
            .lock()
            .rules
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))
    }

    // ---- Policies ----

    fn validate_policy(spec: &PolicySpec) -> Result<()> {
        if spec.name.trim().is_empty() {
            return Err(AlertError::InvalidPolicy("name must not be empty".into()));
        }
        if spec.steps.is_empty() {
            return Err(AlertError::InvalidPolicy("at least one step is required".into()));
        }
        if spec.steps.iter().any(|s| s.actions.is_empty()) {
            return Err(AlertError::InvalidPolicy("every step needs an action".into()));
        }
        if spec
            .steps
            .windows(2)
            .any(|pair| pair[1].delay_secs < pair[0].delay_secs)
        {
            return Err(AlertError::InvalidPolicy(
                "step delays must be non-decreasing".into(),
            ));
        }
        if spec.steps.iter().any(|s| s.delay_secs > MAX_STEP_DELAY_SECS) {
            return Err(AlertError::InvalidPolicy(format!(
                "step delay must not exceed {MAX_STEP_DELAY_SECS}s"
            )));
        }
        Ok(())
    }

    pub fn add_policy(&self, spec: PolicySpec) -> Result<EscalationPolicy> {
        Self::validate_policy(&spec)?;
        let mut state = self.shared.state.lock();
        let id = spec
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| next_prefixed("policy"));
        if state.policy_exists(&id) {
            return Err(AlertError::DuplicatePolicy(id));
        }
        let now = Utc::now();
        let policy = EscalationPolicy {
            id,
            name: spec.name,
            steps: spec.steps,
            created_at: now,
            updated_at: now,
        };
        state.policies.push(policy.clone());
        tracing::info!(
            policy_id = %policy.id,
            steps = policy.steps.len(),
            "Escalation policy added"
        );
        Ok(policy)
    }

    /// Replace a policy's steps. Alerts already firing keep the copy they
    /// captured.
    pub fn update_policy(&self, id: &str, spec: PolicySpec) -> Result<EscalationPolicy> {
        Self::validate_policy(&spec)?;
        let mut state = self.shared.state.lock();
        let policy = state
            .policies
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AlertError::PolicyNotFound(id.to_string()))?;
        policy.name = spec.name;
        policy.steps = spec.steps;
        policy.updated_at = Utc::now();
        tracing::info!(policy_id = %id, "Escalation policy updated");
        Ok(policy.clone())
    }

    pub fn delete_policy(&self, id: &str) -> Result<EscalationPolicy> {
        let mut state = self.shared.state.lock();
        let index = state
            .policies
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AlertError::PolicyNotFound(id.to_string()))?;
        if state
            .rules
            .iter()
            .any(|r| r.escalation_policy_id.as_deref() == Some(id))
        {
            return Err(AlertError::PolicyInUse(id.to_string()));
        }
        let policy = state.policies.remove(index);
        tracing::info!(policy_id = %id, "Escalation policy deleted");
        Ok(policy)
    }

    pub fn policies(&self) -> Vec<EscalationPolicy> {
        self.shared.state.lock().policies.clone()
    }

    pub fn policy(&self, id: &str) -> Result<EscalationPolicy> {
        self.shared
            .state
            .lock()
            .policies
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| AlertError::PolicyNotFound(id.to_string()))
    }

    // ---- Evaluation ----

    /// One evaluation tick over every enabled rule. Returns the number of
    /// alerts raised. A failing rule is logged and skipped.
    pub async fn evaluate_rules(&self) -> usize {
        let now = Utc::now();
        let lookback = window::secs(self.shared.config.lookback_secs);
        let rules: Vec<AlertRule> = self
            .shared
            .state
            .lock()
            .rules
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect();

        let mut fired = 0;
        for rule in rules {
            match self.check_rule(&rule, lookback, now).await {
                Ok(Some(observation)) => {
                    if self.fire_at(&rule.id, observation, now).is_some() {
                        fired += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id, error = %e, "Alert rule evaluation failed");
                }
            }
        }
        if fired > 0 {
            tracing::info!(fired, "Alert evaluation raised alerts");
        }
        fired
    }

    /// The rule's observation when its condition holds.
    async fn check_rule(
        &self,
        rule: &AlertRule,
        lookback: Duration,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<Observation>> {
        let evaluator = self
            .shared
            .registry
            .get(&rule.metric_type)
            .ok_or_else(|| AlertError::UnknownMetricType(rule.metric_type.clone()))?;
        let input = EvalInput {
            threshold: rule.threshold,
            condition: rule.condition,
            lookback,
            now,
        };
        let observation = evaluator.evaluate(&input).await?;
        Ok(observation.filter(|o| evaluate_condition(o.value, rule.threshold, rule.condition)))
    }

    pub fn fire(&self, rule_id: &str, observation: Observation) -> Option<Alert> {
        self.fire_at(rule_id, observation, Utc::now())
    }

    /// Raise an alert for `rule_id` unless an identical firing is still
    /// suppressed. Returns the new alert.
    pub fn fire_at(
        &self,
        rule_id: &str,
        observation: Observation,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        let suppress_for = window::secs(self.shared.config.suppression_secs);
        let (alert, policy) = {
            let mut state = self.shared.state.lock();
            state.suppression.retain(|_, expires| *expires > now);

            let rule = state.rules.iter().find(|r| r.id == rule_id)?.clone();
            let key = suppression_key(&rule.id, &observation.context);
            if state.suppression.contains_key(&key) {
                tracing::debug!(rule_id, "Alert suppressed");
                return None;
            }

            let alert = Alert {
                id: next_prefixed("alert"),
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                metric_type: rule.metric_type.clone(),
                severity: rule.severity,
                value: observation.value,
                threshold: rule.threshold,
                condition: rule.condition,
                message: format!(
                    "{}: {} is {:.2}, {} {}",
                    rule.name,
                    rule.metric_type,
                    observation.value,
                    rule.condition.describe(),
                    rule.threshold
                ),
                context: observation.context,
                status: AlertStatus::Active,
                escalation_step: 0,
                created_at: now,
                acknowledged_at: None,
                acknowledged_by: None,
                resolved_at: None,
                resolved_by: None,
            };
            state.active.insert(alert.id.clone(), alert.clone());
            state.record(alert.clone(), HistoryAction::Triggered, None, now);
            state.suppression.insert(key, window::expires_at(now, suppress_for));
            if let Some(stored) = state.rules.iter_mut().find(|r| r.id == rule_id) {
                stored.trigger_count += 1;
                stored.last_triggered_at = Some(now);
            }
            let policy = rule
                .escalation_policy_id
                .as_deref()
                .and_then(|pid| state.policies.iter().find(|p| p.id == pid).cloned());
            (alert, policy)
        };

        tracing::warn!(
            alert_id = %alert.id,
            rule_id,
            severity = %alert.severity,
            value = alert.value,
            "Alert triggered"
        );
        if let Some(policy) = policy {
            self.schedule_escalation(&alert, policy);
        }
        Some(alert)
    }

    fn schedule_escalation(&self, alert: &Alert, policy: EscalationPolicy) {
        let steps = policy.steps.len();
        let task = run_escalation(
            Arc::clone(&self.shared),
            alert.id.clone(),
            policy,
            Instant::now(),
        );
        self.shared.escalations.spawn(&alert.id, steps, task);
    }

    /// `(alert_id, step_index)` pairs still scheduled.
    pub fn pending_escalations(&self) -> Vec<(String, usize)> {
        self.shared.escalations.pending()
    }

    // ---- Transitions ----

    pub fn acknowledge(&self, id: &str, actor: &str) -> Result<Alert> {
        let alert = self.shared.state.lock().acknowledge(id, actor, Utc::now())?;
        let cancelled = self.shared.escalations.cancel(id);
        tracing::info!(alert_id = %id, actor, cancelled, "Alert acknowledged");
        Ok(alert)
    }

    /// Resolve an active or acknowledged alert, removing it from the
    /// active set.
    pub fn resolve(&self, id: &str, actor: &str) -> Result<Alert> {
        let alert = self.shared.state.lock().resolve(id, actor, Utc::now())?;
        let cancelled = self.shared.escalations.cancel(id);
        tracing::info!(alert_id = %id, actor, cancelled, "Alert resolved");
        Ok(alert)
    }

    // ---- Queries ----

    /// Active and acknowledged alerts, newest first.
    pub fn active_alerts(&self, severity: Option<Severity>) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .shared
            .state
            .lock()
            .active
            .values()
            .filter(|a| severity.map_or(true, |s| a.severity == s))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        alerts
    }

    /// Up to `limit` history entries, newest first.
    pub fn alert_history(
        &self,
        limit: usize,
        severity: Option<Severity>,
    ) -> Vec<AlertHistoryEntry> {
        self.shared
            .state
            .lock()
            .history
            .iter_recent()
            .filter(|e| severity.map_or(true, |s| e.alert.severity == s))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn alert_statistics(&self, window: Duration) -> AlertStatistics {
        self.alert_statistics_at(window, Utc::now())
    }

    pub fn alert_statistics_at(&self, window: Duration, now: DateTime<Utc>) -> AlertStatistics {
        let state = self.shared.state.lock();
        AlertStatistics::compute(state.history.iter(), state.active.values(), window, now)
    }

    pub fn cleanup_history(&self) -> usize {
        self.cleanup_history_at(Utc::now())
    }

    /// Drop history entries older than the retention period and expired
    /// suppression entries. Returns the number of history entries removed.
    pub fn cleanup_history_at(&self, now: DateTime<Utc>) -> usize {
        let retention = window::days(self.shared.config.history_retention_days);
        let cutoff = window::window_start(now, retention);
        let mut state = self.shared.state.lock();
        let removed = state.history.prune_front(|e| e.timestamp < cutoff);
        state.suppression.retain(|_, expires| *expires > now);
        if removed > 0 {
            tracing::info!(removed, "Pruned alert history");
        }
        removed
    }
}

impl Drop for AlertEngine {
    fn drop(&mut self) {
        self.shared.escalations.abort_all();
    }
}

/// Walk the policy's steps in order, each at `started + delay`. A step
/// only acts while the alert is still active.
async fn run_escalation(
    shared: Arc<Shared>,
    alert_id: String,
    policy: EscalationPolicy,
    started: Instant,
) {
    for (index, step) in policy.steps.iter().enumerate() {
        let Some(due) = started.checked_add(std::time::Duration::from_secs(step.delay_secs)) else {
            tracing::warn!(
                alert_id = %alert_id,
                step = index,
                "Escalation step delay out of range"
            );
            break;
        };
        tokio::time::sleep_until(due).await;

        let alert = {
            let mut state = shared.state.lock();
            let now = Utc::now();
            let snapshot = match state.active.get_mut(&alert_id) {
                Some(alert) if alert.status == AlertStatus::Active => {
                    alert.escalation_step = index + 1;
                    alert.clone()
                }
                _ => break,
            };
            state.record(snapshot.clone(), HistoryAction::Escalated, None, now);
            snapshot
        };
        shared.escalations.step_done(&alert_id, index);
        tracing::info!(
            alert_id = %alert_id,
            step = index,
            policy_id = %policy.id,
            "Escalation step fired"
        );

        // Detached: a handler that hangs or panics holds up neither its
        // siblings nor the next step.
        for action in step.actions.iter().copied() {
            let handler = Arc::clone(&shared.handler);
            let alert = alert.clone();
            tokio::spawn(async move {
                if let Err(e) = handler.handle(action, &alert, index).await {
                    tracing::warn!(
                        alert_id = %alert.id,
                        step = index,
                        %action,
                        error = %e,
                        "Escalation action failed"
                    );
                }
            });
        }
    }
    shared.escalations.finished(&alert_id);
}
