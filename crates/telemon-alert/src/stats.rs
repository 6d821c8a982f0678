use crate::model::{Alert, AlertHistoryEntry, AlertStatus, HistoryAction};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use telemon_common::window::window_start;

/// Alert counts over the alerts created inside a window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertStatistics {
    pub total: usize,
    pub active: usize,
    pub acknowledged: usize,
    pub resolved: usize,
    pub escalations: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    /// Keyed by rule id.
    pub by_rule: BTreeMap<String, usize>,
    pub mean_time_to_acknowledge_secs: Option<f64>,
    pub mean_time_to_resolve_secs: Option<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl AlertStatistics {
    /// History gives the latest known state of past alerts; the active set
    /// wins for alerts still open.
    pub fn compute<'a>(
        history: impl Iterator<Item = &'a AlertHistoryEntry>,
        active: impl Iterator<Item = &'a Alert>,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let start = window_start(now, window);
        let mut latest: BTreeMap<&str, &Alert> = BTreeMap::new();
        let mut stats = Self::default();

        for entry in history {
            if entry.alert.created_at < start {
                continue;
            }
            if entry.action == HistoryAction::Escalated {
                stats.escalations += 1;
            }
            latest.insert(entry.alert.id.as_str(), &entry.alert);
        }
        for alert in active {
            if alert.created_at >= start {
                latest.insert(alert.id.as_str(), alert);
            }
        }

        let mut ack_secs = Vec::new();
        let mut resolve_secs = Vec::new();
        for alert in latest.values() {
            stats.total += 1;
            match alert.status {
                AlertStatus::Active => stats.active += 1,
                AlertStatus::Acknowledged => stats.acknowledged += 1,
                AlertStatus::Resolved => stats.resolved += 1,
            }
            *stats.by_severity.entry(alert.severity.to_string()).or_insert(0) += 1;
            *stats.by_status.entry(alert.status.to_string()).or_insert(0) += 1;
            *stats.by_rule.entry(alert.rule_id.clone()).or_insert(0) += 1;
            if let Some(at) = alert.acknowledged_at {
                ack_secs.push((at - alert.created_at).num_milliseconds() as f64 / 1000.0);
            }
            if let Some(at) = alert.resolved_at {
                resolve_secs.push((at - alert.created_at).num_milliseconds() as f64 / 1000.0);
            }
        }
        stats.mean_time_to_acknowledge_secs = mean(&ack_secs);
        stats.mean_time_to_resolve_secs = mean(&resolve_secs);
        stats
    }
}
