use crate::aggregate::AggregateField;
use crate::config::MetricsConfig;
use crate::series;
use crate::store::MetricsStore;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

fn at(base: DateTime<Utc>, secs_ago: i64) -> DateTime<Utc> {
    base - Duration::seconds(secs_ago)
}

fn store_with_cap(max_samples: usize) -> MetricsStore {
    MetricsStore::new(MetricsConfig {
        max_samples_per_series: max_samples,
        ..MetricsConfig::default()
    })
}

#[test]
fn query_counts_only_in_window_samples() {
    let store = MetricsStore::default();
    let now = Utc::now();
    for secs_ago in [600, 400, 299, 120, 10, 0] {
        store.record_at("latency", 5.0, BTreeMap::new(), at(now, secs_ago));
    }

    let agg = store.query_at("latency", Duration::minutes(5), now);
    assert_eq!(agg.count, 4);
    assert_eq!(agg.sum, 20.0);
}

#[test]
fn empty_window_yields_zero_aggregate() {
    let store = MetricsStore::default();
    let agg = store.query("missing", Duration::minutes(5));
    assert_eq!(agg.count, 0);
    assert_eq!(agg.p95, 0.0);
    assert!(agg.is_empty());
}

#[test]
fn percentiles_follow_nearest_rank() {
    let store = MetricsStore::default();
    let now = Utc::now();
    for v in [40.0, 10.0, 30.0, 20.0] {
        store.record_at("q", v, BTreeMap::new(), now);
    }
    let agg = store.query_at("q", Duration::minutes(1), now);
    assert_eq!(agg.p50, 20.0);
    assert_eq!(agg.max, 40.0);
    assert_eq!(crate::percentile(&[10.0, 20.0, 30.0, 40.0], 100.0), agg.max);
}

#[test]
fn one_to_hundred_gives_p95_95_and_mean_50_5() {
    let store = MetricsStore::default();
    let now = Utc::now();
    for v in 1..=100 {
        store.record_at("api:GET /x", v as f64, BTreeMap::new(), now);
    }
    let agg = store.query_at("api:GET /x", Duration::minutes(5), now);
    assert_eq!(agg.count, 100);
    assert_eq!(agg.p95, 95.0);
    assert_eq!(agg.p99, 99.0);
    assert!((agg.mean - 50.5).abs() < f64::EPSILON);
    assert_eq!(agg.min, 1.0);
}

#[test]
fn negative_window_only_sees_now() {
    let store = MetricsStore::default();
    let now = Utc::now();
    store.record_at("s", 1.0, BTreeMap::new(), at(now, 1));
    store.record_at("s", 2.0, BTreeMap::new(), now);

    let agg = store.query_at("s", Duration::seconds(-60), now);
    assert_eq!(agg.count, 1);
    assert_eq!(agg.max, 2.0);
}

#[test]
fn unbounded_window_sees_everything() {
    let store = MetricsStore::default();
    let now = Utc::now();
    store.record_at("s", 1.0, BTreeMap::new(), at(now, 86_000));
    store.record_at("s", 2.0, BTreeMap::new(), now);
    assert_eq!(store.query_at("s", Duration::MAX, now).count, 2);
}

#[test]
fn non_finite_values_are_dropped() {
    let store = MetricsStore::default();
    store.record("s", f64::NAN, BTreeMap::new());
    store.record("s", f64::INFINITY, BTreeMap::new());
    assert_eq!(store.series_count(), 0);
}

#[test]
fn backwards_timestamps_are_clamped_to_tail() {
    let store = MetricsStore::default();
    let now = Utc::now();
    store.record_at("s", 1.0, BTreeMap::new(), now);
    store.record_at("s", 2.0, BTreeMap::new(), at(now, 3600));

    let samples = store.samples_at("s", Duration::minutes(1), now);
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[1].timestamp, now);
}

#[test]
fn series_bound_evicts_oldest_first() {
    let store = store_with_cap(3);
    let now = Utc::now();
    for v in 1..=5 {
        store.record_at("s", v as f64, BTreeMap::new(), now);
    }
    let values: Vec<f64> = store
        .samples_at("s", Duration::minutes(1), now)
        .iter()
        .map(|s| s.value)
        .collect();
    assert_eq!(values, vec![3.0, 4.0, 5.0]);
}

#[test]
fn top_k_breaks_ties_by_name() {
    let store = MetricsStore::default();
    let now = Utc::now();
    store.record_at("api:GET /b", 50.0, BTreeMap::new(), now);
    store.record_at("api:GET /a", 50.0, BTreeMap::new(), now);
    store.record_at("api:GET /c", 80.0, BTreeMap::new(), now);
    store.record_at("db:query", 999.0, BTreeMap::new(), now);

    let top = store.top_k_at("api:", Duration::minutes(5), AggregateField::Max, 3, now);
    let names: Vec<&str> = top.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["api:GET /c", "api:GET /a", "api:GET /b"]);

    let top1 = store.top_k_at("api:", Duration::minutes(5), AggregateField::Max, 1, now);
    assert_eq!(top1.len(), 1);
}

#[test]
fn series_names_keep_registration_order() {
    let store = MetricsStore::default();
    for name in ["api:z", "api:a", "api:m"] {
        store.record(name, 1.0, BTreeMap::new());
    }
    assert_eq!(store.series_names("api:"), vec!["api:z", "api:a", "api:m"]);
}

#[test]
fn evict_expired_is_idempotent() {
    let store = MetricsStore::default();
    let now = Utc::now();
    store.record_at("old", 1.0, BTreeMap::new(), at(now, 90_000));
    store.record_at("mixed", 1.0, BTreeMap::new(), at(now, 90_000));
    store.record_at("mixed", 2.0, BTreeMap::new(), at(now, 60));

    assert_eq!(store.evict_expired_at(now), 2);
    assert_eq!(store.series_count(), 1);
    assert_eq!(store.sample_count(), 1);

    assert_eq!(store.evict_expired_at(now), 0);
    assert_eq!(store.series_count(), 1);
}

#[test]
fn unbounded_retention_keeps_everything() {
    let store = MetricsStore::new(MetricsConfig {
        retention_secs: u64::MAX,
        ..MetricsConfig::default()
    });
    let now = Utc::now();
    store.record_at("old", 1.0, BTreeMap::new(), at(now, 90_000_000));
    assert_eq!(store.evict_expired_at(now), 0);
    assert_eq!(store.sample_count(), 1);
}

#[test]
fn reset_clears_everything() {
    let store = MetricsStore::default();
    store.record_cpu(12.0);
    store.record_error("db", "boom");
    store.reset();
    assert_eq!(store.series_count(), 0);
    assert!(store.time_range().is_none());
}

#[test]
fn concurrent_writers_lose_nothing() {
    let store = Arc::new(MetricsStore::default());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..500 {
                    store.record("shared", i as f64, BTreeMap::new());
                    store.record(&format!("own-{t}"), i as f64, BTreeMap::new());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("writer thread panicked");
    }

    assert_eq!(store.query("shared", Duration::hours(1)).count, 4000);
    assert_eq!(store.series_count(), 9);
    assert_eq!(store.sample_count(), 8000);
}

#[test]
fn api_stats_counts_error_statuses() {
    let store = MetricsStore::default();
    store.record_api_response("get", "/users", 200, 12.0);
    store.record_api_response("GET", "/users", 500, 30.0);
    store.record_api_response("POST", "/login", 401, 8.0);

    let stats = store.api_stats(Duration::minutes(5));
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.total_errors, 2);
    assert_eq!(stats.endpoints[0].endpoint, "GET /users");
    assert_eq!(stats.endpoints[0].errors, 1);
    assert!((stats.endpoints[0].error_rate - 50.0).abs() < 1e-9);
}

#[test]
fn endpoint_report_groups_status_codes() {
    let store = MetricsStore::default();
    store.record_api_response("GET", "/items", 200, 10.0);
    store.record_api_response("GET", "/items", 200, 20.0);
    store.record_api_response("GET", "/items", 404, 5.0);

    let report = store
        .endpoint_report("GET /items", Duration::hours(1))
        .expect("endpoint was recorded");
    assert_eq!(report.aggregate.count, 3);
    assert_eq!(report.status_codes.get("200"), Some(&2));
    assert_eq!(report.status_codes.get("404"), Some(&1));
    assert_eq!(report.recent[0].value, 5.0);

    assert!(store.endpoint_report("GET /nope", Duration::hours(1)).is_none());
}

#[test]
fn slow_reports_use_configured_thresholds() {
    let store = MetricsStore::new(MetricsConfig {
        slow_query_threshold_ms: 100.0,
        slow_request_threshold_ms: 500.0,
        ..MetricsConfig::default()
    });
    store.record_db_query("SELECT 1", 5.0);
    store.record_db_query("SELECT * FROM leases", 250.0);
    store.record_db_query("SELECT * FROM tenants", 400.0);
    store.record_api_response("GET", "/slow", 200, 900.0);
    store.record_api_response("GET", "/fast", 200, 20.0);

    let queries = store.slow_queries(10, Duration::hours(1));
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].query, "SELECT * FROM tenants");

    let summary = store.database_summary_at(Duration::hours(1), Utc::now());
    assert_eq!(summary.slow_queries, 2);
    assert!((summary.slow_query_percent - 200.0 / 3.0).abs() < 1e-9);

    let requests = store.slow_requests(10, Duration::hours(1));
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].endpoint, "GET /slow");
    assert_eq!(requests[0].status, Some(200));
}

#[test]
fn error_stats_group_by_kind() {
    let store = MetricsStore::default();
    store.record_error("database", "connection reset");
    store.record_error("database", "timeout");
    store.record_error("validation", "bad email");

    let stats = store.error_stats(Duration::hours(1));
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_kind.get("database"), Some(&2));
    assert_eq!(stats.recent.len(), 3);
    assert!(stats.rate_per_minute > 0.0);
}

#[test]
fn memory_is_stored_as_percent_with_byte_tags() {
    let store = MetricsStore::default();
    store.record_memory(512, 1024);
    let latest = store
        .latest_at(series::MEMORY, Duration::minutes(5), Utc::now())
        .expect("memory sample recorded");
    assert_eq!(latest.value, 50.0);
    assert_eq!(latest.tag(series::TAG_TOTAL_BYTES), Some("1024"));
}

#[test]
fn overview_serializes_to_json() {
    let store = MetricsStore::default();
    store.record_api_response("GET", "/", 200, 3.0);
    store.record_cpu(40.0);
    let stats = store.stats(Duration::minutes(5));
    let json = serde_json::to_value(&stats).expect("stats serialize");
    assert_eq!(json["series_count"], 2);
    assert_eq!(json["overview"]["requests"], 1);
    assert_eq!(json["overview"]["cpu_percent"]["value"], 40.0);
}
