use crate::aggregator::DashboardAggregator;
use crate::cache::{ViewCache, ViewKind};
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::trends::{MetricTrend, MetricsTrendSource, TrendDirection, TrendSource, TrendSummary};
use crate::views::ClientInfo;
use anyhow::bail;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use telemon_alert::evaluators::{self, Observation};
use telemon_alert::{
    AlertConfig, AlertEngine, Condition, EvaluatorRegistry, LoggingActionHandler, RuleSpec,
    TriggerContext,
};
use telemon_common::types::{HealthStatus, Severity};
use telemon_health::{HealthConfig, HealthEvaluator, HealthProbe, ProbeOutcome};
use telemon_metrics::{series, MetricsStore};

struct Healthy;

#[async_trait]
impl HealthProbe for Healthy {
    fn name(&self) -> &str {
        "memory"
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        Ok(ProbeOutcome::new(HealthStatus::Healthy))
    }
}

struct BrokenTrends;

#[async_trait]
impl TrendSource for BrokenTrends {
    async fn analyze_trends(&self, _window: Duration) -> anyhow::Result<TrendSummary> {
        bail!("analytics backend offline")
    }
}

struct Fixture {
    metrics: Arc<MetricsStore>,
    alerts: Arc<AlertEngine>,
    dashboard: DashboardAggregator,
}

fn fixture_with(trends: Option<Arc<dyn TrendSource>>) -> Fixture {
    let metrics = Arc::new(MetricsStore::default());
    let probes: Vec<Arc<dyn HealthProbe>> = vec![Arc::new(Healthy)];
    let health = Arc::new(HealthEvaluator::new(HealthConfig::default(), probes));
    let alerts = Arc::new(AlertEngine::new(
        AlertConfig {
            seed_defaults: false,
            ..AlertConfig::default()
        },
        EvaluatorRegistry::with_defaults(Arc::clone(&metrics), None),
        Arc::new(LoggingActionHandler),
    ));
    let trends =
        trends.unwrap_or_else(|| Arc::new(MetricsTrendSource::new(Arc::clone(&metrics))));
    let dashboard = DashboardAggregator::new(
        DashboardConfig::default(),
        Arc::clone(&metrics),
        health,
        Arc::clone(&alerts),
        trends,
    );
    Fixture {
        metrics,
        alerts,
        dashboard,
    }
}

fn fixture() -> Fixture {
    fixture_with(None)
}

#[test]
fn cache_entries_expire_after_ttl() {
    let cache: ViewCache<u32> = ViewCache::new(Duration::seconds(30));
    let key = (ViewKind::Dashboard, 3600);
    let now = Utc::now();

    assert_eq!(cache.get_at(&key, now), None);
    cache.insert_at(key, 7, now);
    assert_eq!(cache.get_at(&key, now + Duration::seconds(29)), Some(7));
    assert_eq!(cache.get_at(&key, now + Duration::seconds(30)), None);
    assert!(cache.is_empty(), "expired entry is dropped on read");

    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses), (1, 2));
    assert!((stats.hit_rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.ttl_secs, 30);
}

#[test]
fn unbounded_ttl_never_expires() {
    let cache: ViewCache<u32> = ViewCache::new(telemon_common::window::secs(u64::MAX));
    let key = (ViewKind::Realtime, 60);
    let now = Utc::now();
    cache.insert_at(key, 1, now);
    assert_eq!(cache.get_at(&key, now + Duration::days(365 * 1000)), Some(1));
    assert_eq!(cache.purge_expired_at(now), 0);
}

#[test]
fn purge_drops_only_expired_entries() {
    let cache: ViewCache<&str> = ViewCache::new(Duration::seconds(30));
    let now = Utc::now();
    cache.insert_at((ViewKind::Dashboard, 300), "old", now - Duration::seconds(40));
    cache.insert_at((ViewKind::Realtime, 60), "fresh", now);

    assert_eq!(cache.purge_expired_at(now), 1);
    assert_eq!(cache.purge_expired_at(now), 0);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.clear(), 1);
}

#[tokio::test]
async fn dashboard_is_cached_until_cleared() {
    let f = fixture();
    f.metrics.record_api_response("GET", "/users", 200, 40.0);

    let first = f.dashboard.dashboard(Duration::hours(1)).await;
    assert_eq!(first.performance.requests, 1);

    f.metrics.record_api_response("GET", "/users", 500, 90.0);
    let second = f.dashboard.dashboard(Duration::hours(1)).await;
    assert!(Arc::ptr_eq(&first, &second), "no write-through invalidation");

    let other_window = f.dashboard.dashboard(Duration::minutes(5)).await;
    assert_eq!(other_window.performance.requests, 2);
    assert_eq!(f.dashboard.cache_stats().entries, 2);

    assert_eq!(f.dashboard.clear_cache(), 2);
    let rebuilt = f.dashboard.dashboard(Duration::hours(1)).await;
    assert_eq!(rebuilt.performance.requests, 2);
    assert_eq!(rebuilt.error_endpoints.len(), 1);
    assert_eq!(rebuilt.error_endpoints[0].endpoint, "GET /users");
    assert_eq!(f.dashboard.cache_stats().hits, 1);
}

#[tokio::test]
async fn dashboard_composes_every_component() {
    let f = fixture();
    f.metrics.record_api_response("GET", "/fast", 200, 10.0);
    f.metrics.record_api_response("GET", "/slow", 200, 900.0);
    f.alerts
        .add_rule(RuleSpec {
            id: Some("cpu".into()),
            name: "cpu".into(),
            description: String::new(),
            metric_type: evaluators::CPU_USAGE.into(),
            severity: Severity::Critical,
            threshold: 80.0,
            condition: Condition::GreaterThan,
            enabled: true,
            escalation_policy_id: None,
        })
        .unwrap();
    f.alerts.fire(
        "cpu",
        Observation {
            value: 95.0,
            context: TriggerContext::Cpu {
                usage_percent: 95.0,
                load_average: None,
            },
        },
    );

    let view = f.dashboard.dashboard(Duration::MAX).await;
    assert_eq!(view.window_secs, None);
    assert_eq!(view.slow_endpoints[0].endpoint, "GET /slow");
    assert_eq!(view.health.overall_status, HealthStatus::Healthy);
    assert_eq!(view.alerts.active, 1);
    assert_eq!(view.alerts.active_by_severity.get("critical"), Some(&1));
    assert_eq!(view.alerts.statistics.total, 1);
    assert!(view.trends.is_some());
}

#[tokio::test]
async fn trend_failure_does_not_fail_the_dashboard() {
    let f = fixture_with(Some(Arc::new(BrokenTrends)));
    let view = f.dashboard.dashboard(Duration::hours(1)).await;
    assert!(view.trends.is_none());
}

#[test]
fn trend_compares_window_halves() {
    let metrics = Arc::new(MetricsStore::default());
    let now = Utc::now();
    let tags = |status: &str| {
        telemon_common::types::tags(&[(series::TAG_STATUS, status)])
    };
    let api = series::api_series("GET", "/orders");
    for i in 0..2 {
        metrics.record_at(&api, 100.0, tags("200"), now - Duration::minutes(50 - i));
    }
    for i in 0..6 {
        metrics.record_at(&api, 100.0, tags("200"), now - Duration::minutes(10 - i));
    }
    metrics.record_at(series::CPU, 50.0, BTreeMap::new(), now - Duration::minutes(45));
    metrics.record_at(series::CPU, 50.0, BTreeMap::new(), now - Duration::minutes(5));

    let summary = MetricsTrendSource::new(metrics).analyze_at(Duration::hours(1), now);
    assert_eq!(summary.window_secs, 3600);
    let find = |name: &str| {
        summary
            .trends
            .iter()
            .find(|t| t.metric == name)
            .cloned()
            .unwrap()
    };
    let requests = find("requests");
    assert_eq!((requests.previous, requests.current), (2.0, 6.0));
    assert_eq!(requests.direction, TrendDirection::Rising);
    assert_eq!(find("cpu_percent").direction, TrendDirection::Stable);
    assert_eq!(find("error_rate_percent").change_percent, 0.0);
}

#[test]
fn unbounded_retention_and_window_do_not_overflow() {
    let metrics = Arc::new(MetricsStore::new(telemon_metrics::MetricsConfig {
        retention_secs: u64::MAX,
        ..telemon_metrics::MetricsConfig::default()
    }));
    let now = Utc::now();
    let api = series::api_series("GET", "/orders");
    metrics.record_at(&api, 100.0, BTreeMap::new(), now - Duration::minutes(5));

    let summary = MetricsTrendSource::new(metrics).analyze_at(Duration::MAX, now);
    assert_eq!(summary.window_secs, Duration::MAX.num_seconds());
    let requests = summary
        .trends
        .iter()
        .find(|t| t.metric == "requests")
        .cloned()
        .unwrap();
    assert_eq!(requests.current, 1.0);
}

#[test]
fn trend_direction_uses_stable_band() {
    assert_eq!(MetricTrend::new("x", 100.0, 104.0).direction, TrendDirection::Stable);
    assert_eq!(MetricTrend::new("x", 100.0, 80.0).direction, TrendDirection::Falling);
    assert_eq!(MetricTrend::new("x", 0.0, 3.0).change_percent, 100.0);
}

#[test]
fn clients_are_bookkeeping_only() {
    let f = fixture();
    let info = ClientInfo {
        name: Some("wallboard".into()),
        views: vec!["realtime".into()],
    };
    f.dashboard.register_client("b", info.clone()).unwrap();
    f.dashboard.register_client("a", ClientInfo::default()).unwrap();
    f.dashboard.register_client("b", ClientInfo::default()).unwrap();

    let clients = f.dashboard.clients();
    assert_eq!(clients.len(), 2);
    assert_eq!(clients[0].id, "a");
    assert!(clients[1].info.name.is_none(), "re-registration replaces info");
    assert_eq!(f.dashboard.realtime_metrics().clients, 2);

    assert!(matches!(
        f.dashboard.register_client("  ", info),
        Err(DashboardError::InvalidClient(_))
    ));
    f.dashboard.unregister_client("a").unwrap();
    assert!(matches!(
        f.dashboard.unregister_client("a"),
        Err(DashboardError::ClientNotFound(_))
    ));
}

#[test]
fn realtime_view_uses_last_minute() {
    let f = fixture();
    let now = Utc::now();
    let api = series::api_series("GET", "/old");
    f.metrics
        .record_at(&api, 10.0, BTreeMap::new(), now - Duration::minutes(3));
    f.metrics.record_cpu(42.0);

    let view = f.dashboard.realtime_metrics();
    assert_eq!(view.requests_per_minute, 0.0);
    assert_eq!(view.cpu_percent, Some(42.0));
    assert_eq!(view.active_alerts, 0);
    assert!(Arc::ptr_eq(&view, &f.dashboard.realtime_metrics()));
}

#[test]
fn config_view_lists_windows_and_widgets() {
    let f = fixture();
    let settings = f.dashboard.dashboard_config();
    assert_eq!(settings.cache_ttl_secs, 30);
    assert!(settings.supported_windows.contains(&"7d"));
    assert_eq!(settings.widgets.len(), 6);
    let json = serde_json::to_value(&settings).unwrap();
    assert_eq!(json["default_window"], "1h");
}
