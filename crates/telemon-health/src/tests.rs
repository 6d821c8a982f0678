use crate::config::{HealthConfig, IntegrationConfig};
use crate::error::HealthError;
use crate::evaluator::HealthEvaluator;
use crate::probe::{DatabasePing, HealthProbe, IntegrationSource, ProbeOutcome};
use crate::probes::{self, grade_usage, DependenciesProbe, DiskProbe, EnvIntegrations};
use anyhow::bail;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use telemon_collector::{ResourceSnapshot, ResourceSource};
use telemon_common::types::HealthStatus;
use telemon_metrics::MetricsStore;

struct FixedResources {
    memory_percent: f64,
    cpu_percent: f64,
}

impl ResourceSource for FixedResources {
    fn snapshot(&self) -> anyhow::Result<ResourceSnapshot> {
        Ok(ResourceSnapshot {
            memory_used_bytes: 1,
            memory_total_bytes: 2,
            memory_percent: self.memory_percent,
            cpu_percent: self.cpu_percent,
            cpu_count: 4,
            ..ResourceSnapshot::default()
        })
    }
}

enum PingMode {
    Ok,
    Fail,
    Delay(Duration),
}

struct FakePing(PingMode);

#[async_trait]
impl DatabasePing for FakePing {
    async fn ping(&self) -> anyhow::Result<()> {
        match &self.0 {
            PingMode::Ok => Ok(()),
            PingMode::Fail => bail!("connection refused"),
            PingMode::Delay(d) => {
                tokio::time::sleep(*d).await;
                Ok(())
            }
        }
    }
}

struct Fixed(&'static str, HealthStatus);

#[async_trait]
impl HealthProbe for Fixed {
    fn name(&self) -> &str {
        self.0
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        Ok(ProbeOutcome::new(self.1))
    }
}

struct Failing;

#[async_trait]
impl HealthProbe for Failing {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        bail!("socket closed")
    }
}

fn evaluator_with(
    memory: f64,
    cpu: f64,
    ping: Option<PingMode>,
    metrics: Arc<MetricsStore>,
) -> HealthEvaluator {
    HealthEvaluator::with_default_probes(
        HealthConfig::default(),
        metrics,
        Arc::new(FixedResources {
            memory_percent: memory,
            cpu_percent: cpu,
        }),
        ping.map(|mode| Arc::new(FakePing(mode)) as Arc<dyn DatabasePing>),
        None,
    )
}

fn fixed(probes: &[(&'static str, HealthStatus)]) -> HealthEvaluator {
    let probes = probes
        .iter()
        .map(|(name, status)| Arc::new(Fixed(*name, *status)) as Arc<dyn HealthProbe>)
        .collect();
    HealthEvaluator::new(HealthConfig::default(), probes)
}

#[test]
fn usage_grading_thresholds() {
    assert_eq!(grade_usage(72.0, 90.0, 0.8), HealthStatus::Healthy);
    assert_eq!(grade_usage(72.5, 90.0, 0.8), HealthStatus::Warning);
    assert_eq!(grade_usage(90.0, 90.0, 0.8), HealthStatus::Warning);
    assert_eq!(grade_usage(90.1, 90.0, 0.8), HealthStatus::Critical);
}

#[tokio::test]
async fn overall_is_worst_of_enabled_results() {
    use HealthStatus::*;

    let snapshot = fixed(&[("a", Healthy), ("b", Warning), ("c", Disabled)])
        .evaluate()
        .await;
    assert_eq!(snapshot.overall_status, Warning);
    assert_eq!(snapshot.summary.total, 2);
    assert_eq!(snapshot.results.len(), 3);

    let snapshot = fixed(&[("a", Warning), ("b", Critical)]).evaluate().await;
    assert_eq!(snapshot.overall_status, Critical);

    let snapshot = fixed(&[("a", Disabled)]).evaluate().await;
    assert_eq!(snapshot.overall_status, Healthy);
    assert_eq!(snapshot.summary.total, 0);
}

#[tokio::test]
async fn failing_probe_is_critical_and_others_continue() {
    let probes: Vec<Arc<dyn HealthProbe>> = vec![
        Arc::new(Failing),
        Arc::new(Fixed("ok", HealthStatus::Healthy)),
    ];
    let evaluator = HealthEvaluator::new(HealthConfig::default(), probes);
    let snapshot = evaluator.evaluate().await;

    let flaky = &snapshot.results["flaky"];
    assert_eq!(flaky.status, HealthStatus::Critical);
    assert_eq!(flaky.message.as_deref(), Some("socket closed"));
    assert_eq!(snapshot.results["ok"].status, HealthStatus::Healthy);
    assert_eq!(snapshot.failing_probes(), vec!["flaky".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn slow_probe_times_out_as_critical() {
    let evaluator = evaluator_with(
        10.0,
        10.0,
        Some(PingMode::Delay(Duration::from_secs(30))),
        Arc::new(MetricsStore::default()),
    );
    let result = evaluator
        .service_health(probes::DATABASE)
        .await
        .expect("database probe registered");
    assert_eq!(result.status, HealthStatus::Critical);
    assert!(result.message.unwrap_or_default().contains("Timed out"));
}

#[tokio::test(start_paused = true)]
async fn slow_ping_is_a_warning() {
    let evaluator = evaluator_with(
        10.0,
        10.0,
        Some(PingMode::Delay(Duration::from_millis(1500))),
        Arc::new(MetricsStore::default()),
    );
    let result = evaluator.service_health(probes::DATABASE).await.unwrap();
    assert_eq!(result.status, HealthStatus::Warning);
}

#[tokio::test]
async fn unbounded_query_stats_window_is_accepted() {
    let metrics = Arc::new(MetricsStore::default());
    metrics.record_db_query("SELECT 1", 3.0);
    let evaluator = HealthEvaluator::with_default_probes(
        HealthConfig {
            db_stats_window_secs: u64::MAX,
            ..HealthConfig::default()
        },
        metrics,
        Arc::new(FixedResources {
            memory_percent: 10.0,
            cpu_percent: 10.0,
        }),
        Some(Arc::new(FakePing(PingMode::Ok)) as Arc<dyn DatabasePing>),
        None,
    );
    let result = evaluator.service_health(probes::DATABASE).await.unwrap();
    assert_eq!(result.status, HealthStatus::Healthy);
    assert_eq!(result.details["queries"], 1);
}

#[tokio::test]
async fn slow_query_share_is_critical_even_with_fast_ping() {
    let metrics = Arc::new(MetricsStore::default());
    for _ in 0..8 {
        metrics.record_db_query("SELECT 1", 3.0);
    }
    for _ in 0..2 {
        metrics.record_db_query("SELECT * FROM payments", 2_500.0);
    }
    let evaluator = evaluator_with(10.0, 10.0, Some(PingMode::Ok), metrics);
    let result = evaluator.service_health(probes::DATABASE).await.unwrap();
    assert_eq!(result.status, HealthStatus::Critical);
    assert_eq!(result.details["queries"], 10);
}

#[tokio::test]
async fn readiness_follows_database() {
    let metrics = Arc::new(MetricsStore::default());
    let down = evaluator_with(10.0, 10.0, Some(PingMode::Fail), Arc::clone(&metrics));
    let readiness = down.is_ready().await;
    assert!(!readiness.ready);
    assert_eq!(readiness.database.status, HealthStatus::Critical);

    let unconfigured = evaluator_with(10.0, 10.0, None, metrics);
    let readiness = unconfigured.is_ready().await;
    assert!(readiness.ready);
    assert_eq!(readiness.database.status, HealthStatus::Disabled);
}

#[tokio::test]
async fn capacity_lists_every_critical_reason() {
    let evaluator = evaluator_with(
        95.0,
        99.0,
        Some(PingMode::Ok),
        Arc::new(MetricsStore::default()),
    );
    let capacity = evaluator.can_handle_requests().await;
    assert!(!capacity.can_handle_requests);
    assert_eq!(capacity.reasons.len(), 2);
    assert!(capacity.reasons[0].starts_with("memory"));
    assert_eq!(capacity.checks.len(), 3);
}

#[tokio::test]
async fn disabled_probes_are_not_run() {
    let config = HealthConfig {
        disabled_probes: vec!["flaky".into()],
        ..HealthConfig::default()
    };
    let probes: Vec<Arc<dyn HealthProbe>> = vec![Arc::new(Failing)];
    let evaluator = HealthEvaluator::new(config, probes);
    let snapshot = evaluator.evaluate().await;
    assert_eq!(snapshot.results["flaky"].status, HealthStatus::Disabled);
    assert_eq!(snapshot.overall_status, HealthStatus::Healthy);
}

#[tokio::test]
async fn unknown_service_is_an_error() {
    let evaluator = fixed(&[("a", HealthStatus::Healthy)]);
    let err = evaluator.service_health("nope").await.unwrap_err();
    assert!(matches!(err, HealthError::UnknownProbe(name) if name == "nope"));
}

#[tokio::test]
async fn history_is_bounded_and_newest_first() {
    let config = HealthConfig {
        history_size: 3,
        ..HealthConfig::default()
    };
    let probes: Vec<Arc<dyn HealthProbe>> = vec![Arc::new(Fixed("a", HealthStatus::Healthy))];
    let evaluator = HealthEvaluator::new(config, probes);
    let mut stamps = Vec::new();
    for _ in 0..5 {
        stamps.push(evaluator.evaluate().await.timestamp);
    }

    let history = evaluator.history(10);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].timestamp, stamps[4]);
    assert_eq!(history[2].timestamp, stamps[2]);
    assert_eq!(evaluator.history(1).len(), 1);

    let summary = evaluator.summary();
    assert_eq!(summary.snapshots, 3);
    assert_eq!(summary.availability_percent, 100.0);
    assert_eq!(summary.current_status, Some(HealthStatus::Healthy));
}

#[tokio::test]
async fn summary_counts_critical_probes() {
    let evaluator = fixed(&[("db", HealthStatus::Critical), ("cpu", HealthStatus::Healthy)]);
    evaluator.evaluate().await;
    evaluator.evaluate().await;
    let summary = evaluator.summary();
    assert_eq!(summary.critical, 2);
    assert_eq!(summary.availability_percent, 0.0);
    assert_eq!(summary.critical_by_probe.get("db"), Some(&2));
}

#[tokio::test]
async fn disk_probe_checks_writable_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ok = DiskProbe::new(vec![dir.path().to_path_buf()]);
    assert_eq!(ok.check().await.unwrap().status, HealthStatus::Healthy);

    let missing = DiskProbe::new(vec![dir.path().join("does-not-exist")]);
    let outcome = missing.check().await.unwrap();
    assert_eq!(outcome.status, HealthStatus::Warning);
    assert!(outcome.details.contains_key("failed_paths"));
}

#[tokio::test]
async fn dependencies_warn_on_missing_environment() {
    let source = EnvIntegrations::new(vec![
        IntegrationConfig {
            name: "payments".into(),
            enabled: true,
            required_env: vec!["TELEMON_TEST_SURELY_UNSET_VAR".into()],
        },
        IntegrationConfig {
            name: "mailer".into(),
            enabled: false,
            required_env: vec!["TELEMON_TEST_SURELY_UNSET_VAR".into()],
        },
    ]);
    let statuses = source.integrations();
    assert!(statuses[0].error.is_some());

    let probe = DependenciesProbe::new(Some(Arc::new(source)));
    let outcome = probe.check().await.unwrap();
    assert_eq!(outcome.status, HealthStatus::Warning);
    assert!(outcome.message.unwrap_or_default().contains("payments"));

    let none = DependenciesProbe::new(None);
    assert_eq!(none.check().await.unwrap().status, HealthStatus::Disabled);
}

#[tokio::test]
async fn status_includes_liveness() {
    let evaluator = fixed(&[("a", HealthStatus::Healthy)]);
    let report = evaluator.status().await.unwrap();
    assert!(report.liveness.alive);
    assert_eq!(report.liveness.pid, std::process::id());
    assert_eq!(evaluator.history(10).len(), 1);
}
