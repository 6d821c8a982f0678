use crate::config::HealthConfig;
use crate::error::{HealthError, Result};
use crate::probe::{DatabasePing, HealthProbe, IntegrationSource, ProbeOutcome};
use crate::probes::{self, CpuProbe, DatabaseProbe, DependenciesProbe, DiskProbe, MemoryProbe};
use crate::snapshot::{
    Capacity, HealthCheckResult, HealthSnapshot, HistorySummary, Liveness, Readiness,
    StatusReport,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use telemon_collector::ResourceSource;
use telemon_common::ring::BoundedRing;
use telemon_common::types::HealthStatus;
use telemon_common::window;
use telemon_metrics::MetricsStore;
use tokio::time::Instant;

/// Probes rerun by [`HealthEvaluator::can_handle_requests`].
const CAPACITY_PROBES: [&str; 3] = [probes::MEMORY, probes::CPU, probes::DATABASE];

pub struct HealthEvaluator {
    config: HealthConfig,
    probes: Vec<Arc<dyn HealthProbe>>,
    history: Mutex<BoundedRing<HealthSnapshot>>,
    started: Instant,
}

impl HealthEvaluator {
    pub fn new(config: HealthConfig, probes: Vec<Arc<dyn HealthProbe>>) -> Self {
        let history = Mutex::new(BoundedRing::new(config.history_size));
        Self {
            config,
            probes,
            history,
            started: Instant::now(),
        }
    }

    /// The standard probe set: database, memory, cpu, disk, dependencies.
    pub fn with_default_probes(
        config: HealthConfig,
        metrics: Arc<MetricsStore>,
        resources: Arc<dyn ResourceSource>,
        database: Option<Arc<dyn DatabasePing>>,
        integrations: Option<Arc<dyn IntegrationSource>>,
    ) -> Self {
        let probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(DatabaseProbe::new(
                database,
                metrics,
                config.db_response_warning_ms,
                config.slow_query_critical_percent,
                window::secs(config.db_stats_window_secs),
            )),
            Arc::new(MemoryProbe::new(
                Arc::clone(&resources),
                config.memory_threshold_percent,
                config.warning_ratio,
            )),
            Arc::new(CpuProbe::new(
                resources,
                config.cpu_threshold_percent,
                config.warning_ratio,
            )),
            Arc::new(DiskProbe::new(config.writable_paths.clone())),
            Arc::new(DependenciesProbe::new(integrations)),
        ];
        Self::new(config, probes)
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn probe_names(&self) -> Vec<&str> {
        self.probes.iter().map(|p| p.name()).collect()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Run every probe and record the snapshot in the history.
    pub async fn evaluate(&self) -> HealthSnapshot {
        let mut results = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            results.push(self.run_probe(probe.as_ref()).await);
        }
        let snapshot = HealthSnapshot::new(results, self.uptime_secs());

        let previous = {
            let mut history = self.history.lock();
            let previous = history.latest().map(|s| s.overall_status);
            history.push(snapshot.clone());
            previous
        };
        if previous.is_some_and(|p| p != snapshot.overall_status) {
            tracing::warn!(
                from = ?previous,
                to = %snapshot.overall_status,
                failing = ?snapshot.failing_probes(),
                "Overall health changed"
            );
        }
        snapshot
    }

    async fn run_probe(&self, probe: &dyn HealthProbe) -> HealthCheckResult {
        let name = probe.name().to_string();
        if self.config.disabled_probes.iter().any(|d| d == &name) {
            return stamp(name, ProbeOutcome::disabled("Disabled by configuration"), 0.0);
        }

        let timeout = std::time::Duration::from_secs(self.config.probe_timeout_secs);
        let started = Instant::now();
        let outcome = match tokio::time::timeout(timeout, probe.check()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(probe = %name, error = %e, "Health probe failed");
                ProbeOutcome::new(HealthStatus::Critical).with_message(e.to_string())
            }
            Err(_) => {
                tracing::warn!(
                    probe = %name,
                    timeout_secs = timeout.as_secs(),
                    "Health probe timed out"
                );
                ProbeOutcome::new(HealthStatus::Critical)
                    .with_message(format!("Timed out after {}s", timeout.as_secs()))
            }
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        stamp(name, outcome, elapsed_ms)
    }

    fn find(&self, name: &str) -> Option<&dyn HealthProbe> {
        self.probes
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    /// Rerun one named probe.
    pub async fn service_health(&self, name: &str) -> Result<HealthCheckResult> {
        let probe = self
            .find(name)
            .ok_or_else(|| HealthError::UnknownProbe(name.to_string()))?;
        Ok(self.run_probe(probe).await)
    }

    /// Ready unless the database probe is critical.
    pub async fn is_ready(&self) -> Readiness {
        let database = match self.find(probes::DATABASE) {
            Some(probe) => self.run_probe(probe).await,
            None => stamp(
                probes::DATABASE.to_string(),
                ProbeOutcome::disabled("No database probe registered"),
                0.0,
            ),
        };
        Readiness {
            ready: !database.status.is_critical(),
            database,
            timestamp: Utc::now(),
        }
    }

    /// Liveness without probing.
    pub fn is_alive(&self) -> Result<Liveness> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| HealthError::ProcessMetadata(e.to_string()))?;
        Ok(Liveness {
            alive: true,
            pid: pid.as_u32(),
            uptime_secs: self.uptime_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Rerun memory, cpu and database; every critical verdict is a reason
    /// to refuse work.
    pub async fn can_handle_requests(&self) -> Capacity {
        let mut checks = BTreeMap::new();
        let mut reasons = Vec::new();
        for name in CAPACITY_PROBES {
            let Some(probe) = self.find(name) else {
                continue;
            };
            let result = self.run_probe(probe).await;
            if result.status.is_critical() {
                reasons.push(match &result.message {
                    Some(message) => format!("{name}: {message}"),
                    None => format!("{name}: critical"),
                });
            }
            checks.insert(result.name.clone(), result);
        }
        Capacity {
            can_handle_requests: reasons.is_empty(),
            reasons,
            checks,
            timestamp: Utc::now(),
        }
    }

    /// Up to `limit` snapshots, newest first.
    pub fn history(&self, limit: usize) -> Vec<HealthSnapshot> {
        self.history
            .lock()
            .iter_recent()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<HealthSnapshot> {
        self.history.lock().latest().cloned()
    }

    pub fn summary(&self) -> HistorySummary {
        let history = self.history.lock();
        let mut summary = HistorySummary {
            snapshots: history.len(),
            healthy: 0,
            warning: 0,
            critical: 0,
            availability_percent: 100.0,
            current_status: history.latest().map(|s| s.overall_status),
            oldest: history.iter().next().map(|s| s.timestamp),
            newest: history.latest().map(|s| s.timestamp),
            critical_by_probe: BTreeMap::new(),
        };
        for snapshot in history.iter() {
            match snapshot.overall_status {
                HealthStatus::Healthy | HealthStatus::Disabled => summary.healthy += 1,
                HealthStatus::Warning => summary.warning += 1,
                HealthStatus::Critical => summary.critical += 1,
            }
            for name in snapshot.failing_probes() {
                *summary.critical_by_probe.entry(name).or_insert(0) += 1;
            }
        }
        if summary.snapshots > 0 {
            summary.availability_percent =
                (summary.snapshots - summary.critical) as f64 / summary.snapshots as f64 * 100.0;
        }
        summary
    }

    /// Fresh snapshot plus liveness.
    pub async fn status(&self) -> Result<StatusReport> {
        let liveness = self.is_alive()?;
        let snapshot = self.evaluate().await;
        Ok(StatusReport { snapshot, liveness })
    }
}

fn stamp(name: String, outcome: ProbeOutcome, response_time_ms: f64) -> HealthCheckResult {
    HealthCheckResult {
        name,
        status: outcome.status,
        response_time_ms,
        message: outcome.message,
        details: outcome.details,
        timestamp: Utc::now(),
    }
}
