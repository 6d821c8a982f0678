use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use telemon_common::types::HealthStatus;

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: HealthStatus,
    pub response_time_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub details: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

/// Counts over non-disabled results only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub total: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
}

impl SummaryCounts {
    pub fn from_statuses<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a HealthStatus>,
    {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                HealthStatus::Healthy => counts.healthy += 1,
                HealthStatus::Warning => counts.warning += 1,
                HealthStatus::Critical => counts.critical += 1,
                HealthStatus::Disabled => continue,
            }
            counts.total += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,
    pub overall_status: HealthStatus,
    pub results: BTreeMap<String, HealthCheckResult>,
    pub summary: SummaryCounts,
    pub uptime_secs: u64,
}

impl HealthSnapshot {
    pub fn new(results: Vec<HealthCheckResult>, uptime_secs: u64) -> Self {
        let overall_status = HealthStatus::worst(results.iter().map(|r| r.status));
        let summary = SummaryCounts::from_statuses(results.iter().map(|r| &r.status));
        Self {
            timestamp: Utc::now(),
            overall_status,
            results: results.into_iter().map(|r| (r.name.clone(), r)).collect(),
            summary,
            uptime_secs,
        }
    }

    /// Names of the probes that came back critical.
    pub fn failing_probes(&self) -> Vec<String> {
        self.results
            .values()
            .filter(|r| r.status.is_critical())
            .map(|r| r.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Liveness {
    pub alive: bool,
    pub pid: u32,
    pub uptime_secs: u64,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub database: HealthCheckResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Capacity {
    pub can_handle_requests: bool,
    /// One entry per critical verdict.
    pub reasons: Vec<String>,
    pub checks: BTreeMap<String, HealthCheckResult>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistorySummary {
    pub snapshots: usize,
    pub healthy: usize,
    pub warning: usize,
    pub critical: usize,
    /// Share of snapshots that were not critical.
    pub availability_percent: f64,
    pub current_status: Option<HealthStatus>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// Critical count per probe across the retained history.
    pub critical_by_probe: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub snapshot: HealthSnapshot,
    pub liveness: Liveness,
}
