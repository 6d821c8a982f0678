//! Read-only reports derived from the store.
//!
//! These back the metrics admin surface (`stats`, `slowQueries`,
//! `performanceOverview`, `apiStats`, `slowRequests`, `endpointReport`,
//! `errorStats`). Every report is computed on call from in-window samples.

use crate::aggregate::WindowedAggregate;
use crate::series;
use crate::store::{aggregate_samples, MetricsStore};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use telemon_common::types::MetricSample;
use telemon_common::window::{clamp_window, effective_minutes};

const RECENT_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct EndpointStats {
    pub endpoint: String,
    pub requests: u64,
    pub errors: u64,
    pub error_rate: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiStats {
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub endpoints: Vec<EndpointStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlowRequest {
    pub endpoint: String,
    pub status: Option<u16>,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointReport {
    pub endpoint: String,
    pub aggregate: WindowedAggregate,
    pub errors: u64,
    pub error_rate: f64,
    pub status_codes: BTreeMap<String, u64>,
    /// Newest first.
    pub recent: Vec<MetricSample>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub kind: String,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorStats {
    pub total: u64,
    pub rate_per_minute: f64,
    pub by_kind: BTreeMap<String, u64>,
    /// Newest first.
    pub recent: Vec<ErrorEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlowQuery {
    pub query: String,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseSummary {
    pub queries: u64,
    pub mean_ms: f64,
    pub p95_ms: f64,
    pub slow_queries: u64,
    pub slow_query_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceReading {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceOverview {
    pub requests: u64,
    pub requests_per_minute: f64,
    pub mean_response_ms: f64,
    pub p95_response_ms: f64,
    pub p99_response_ms: f64,
    pub errors: u64,
    pub error_rate: f64,
    pub database: DatabaseSummary,
    pub memory_percent: Option<ResourceReading>,
    pub cpu_percent: Option<ResourceReading>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub series_count: usize,
    pub sample_count: usize,
    pub oldest_sample: Option<DateTime<Utc>>,
    pub newest_sample: Option<DateTime<Utc>>,
    pub overview: PerformanceOverview,
    pub error_total: u64,
}

/// Status tag of an API sample, when present and numeric.
pub fn status_of(sample: &MetricSample) -> Option<u16> {
    sample.tag(series::TAG_STATUS)?.parse().ok()
}

/// 4xx and 5xx responses count as errors.
pub fn is_error_status(sample: &MetricSample) -> bool {
    status_of(sample).is_some_and(|s| s >= 400)
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

impl MetricsStore {
    pub fn api_stats(&self, window: Duration) -> ApiStats {
        self.api_stats_at(window, Utc::now())
    }

    pub fn api_stats_at(&self, window: Duration, now: DateTime<Utc>) -> ApiStats {
        let mut total_requests = 0;
        let mut total_errors = 0;
        let mut endpoints = Vec::new();

        for name in self.series_names(series::API_PREFIX) {
            let samples = self.samples_at(&name, window, now);
            if samples.is_empty() {
                continue;
            }
            let agg = aggregate_samples(&samples, window, now);
            let errors = samples.iter().filter(|s| is_error_status(s)).count() as u64;
            total_requests += agg.count;
            total_errors += errors;
            endpoints.push(EndpointStats {
                endpoint: series::endpoint_of(&name).to_string(),
                requests: agg.count,
                errors,
                error_rate: percent(errors, agg.count),
                mean_ms: agg.mean,
                p50_ms: agg.p50,
                p95_ms: agg.p95,
                p99_ms: agg.p99,
                max_ms: agg.max,
            });
        }

        endpoints.sort_by(|a, b| {
            b.requests
                .cmp(&a.requests)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });

        ApiStats {
            total_requests,
            total_errors,
            error_rate: percent(total_errors, total_requests),
            endpoints,
        }
    }

    /// Requests slower than the configured threshold, slowest first.
    pub fn slow_requests(&self, limit: usize, window: Duration) -> Vec<SlowRequest> {
        let now = Utc::now();
        let threshold = self.config().slow_request_threshold_ms;
        let mut slow: Vec<SlowRequest> = self
            .samples_with_prefix_at(series::API_PREFIX, window, now)
            .into_iter()
            .filter(|s| s.value > threshold)
            .map(|s| SlowRequest {
                endpoint: series::endpoint_of(&s.series).to_string(),
                status: status_of(&s),
                duration_ms: s.value,
                timestamp: s.timestamp,
            })
            .collect();
        slow.sort_by(|a, b| {
            b.duration_ms
                .total_cmp(&a.duration_ms)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        slow.truncate(limit);
        slow
    }

    /// Detailed report for one endpoint, given either as `"GET /path"` or
    /// as the full series name. `None` when the endpoint was never recorded.
    pub fn endpoint_report(&self, endpoint: &str, window: Duration) -> Option<EndpointReport> {
        let now = Utc::now();
        let name = if endpoint.starts_with(series::API_PREFIX) {
            endpoint.to_string()
        } else {
            format!("{}{endpoint}", series::API_PREFIX)
        };
        if !self.series_names(&name).iter().any(|n| n == &name) {
            return None;
        }

        let samples = self.samples_at(&name, window, now);
        let aggregate = aggregate_samples(&samples, window, now);
        let mut status_codes = BTreeMap::new();
        let mut errors = 0;
        for sample in &samples {
            let code = status_of(sample)
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            *status_codes.entry(code).or_insert(0u64) += 1;
            if is_error_status(sample) {
                errors += 1;
            }
        }
        let recent = samples.iter().rev().take(RECENT_LIMIT).cloned().collect();

        Some(EndpointReport {
            endpoint: series::endpoint_of(&name).to_string(),
            aggregate,
            errors,
            error_rate: percent(errors, aggregate.count),
            status_codes,
            recent,
        })
    }

    pub fn error_stats(&self, window: Duration) -> ErrorStats {
        self.error_stats_at(window, Utc::now())
    }

    pub fn error_stats_at(&self, window: Duration, now: DateTime<Utc>) -> ErrorStats {
        let samples = self.samples_with_prefix_at(series::ERROR_PREFIX, window, now);
        let mut by_kind = BTreeMap::new();
        for sample in &samples {
            let kind = sample
                .series
                .strip_prefix(series::ERROR_PREFIX)
                .unwrap_or(&sample.series);
            *by_kind.entry(kind.to_string()).or_insert(0u64) += 1;
        }

        let span = samples
            .iter()
            .map(|s| now - s.timestamp)
            .max()
            .unwrap_or_else(Duration::zero);
        let total = samples.len() as u64;

        let mut recent: Vec<ErrorEvent> = samples
            .iter()
            .map(|s| ErrorEvent {
                kind: s
                    .series
                    .strip_prefix(series::ERROR_PREFIX)
                    .unwrap_or(&s.series)
                    .to_string(),
                message: s.tag(series::TAG_MESSAGE).map(str::to_string),
                timestamp: s.timestamp,
            })
            .collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(RECENT_LIMIT);

        ErrorStats {
            total,
            rate_per_minute: total as f64 / effective_minutes(window, span),
            by_kind,
            recent,
        }
    }

    /// Queries slower than the slow-query threshold, slowest first.
    pub fn slow_queries(&self, limit: usize, window: Duration) -> Vec<SlowQuery> {
        let threshold = self.config().slow_query_threshold_ms;
        let mut slow: Vec<SlowQuery> = self
            .samples(series::DB_QUERY, window)
            .into_iter()
            .filter(|s| s.value > threshold)
            .map(|s| SlowQuery {
                query: s.tag(series::TAG_QUERY).unwrap_or_default().to_string(),
                duration_ms: s.value,
                timestamp: s.timestamp,
            })
            .collect();
        slow.sort_by(|a, b| b.duration_ms.total_cmp(&a.duration_ms));
        slow.truncate(limit);
        slow
    }

    pub fn database_summary_at(&self, window: Duration, now: DateTime<Utc>) -> DatabaseSummary {
        let samples = self.samples_at(series::DB_QUERY, window, now);
        let agg = aggregate_samples(&samples, window, now);
        let threshold = self.config().slow_query_threshold_ms;
        let slow = samples.iter().filter(|s| s.value > threshold).count() as u64;
        DatabaseSummary {
            queries: agg.count,
            mean_ms: agg.mean,
            p95_ms: agg.p95,
            slow_queries: slow,
            slow_query_percent: percent(slow, agg.count),
        }
    }

    pub fn performance_overview(&self, window: Duration) -> PerformanceOverview {
        self.performance_overview_at(window, Utc::now())
    }

    pub fn performance_overview_at(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> PerformanceOverview {
        let window = clamp_window(window);
        let api = self.samples_with_prefix_at(series::API_PREFIX, window, now);
        let agg = aggregate_samples(&api, window, now);
        let span = api
            .iter()
            .map(|s| now - s.timestamp)
            .max()
            .unwrap_or_else(Duration::zero);
        let errors = api.iter().filter(|s| is_error_status(s)).count() as u64;
        let reading = |name: &str| {
            self.latest_at(name, window, now).map(|s| ResourceReading {
                value: s.value,
                timestamp: s.timestamp,
            })
        };

        PerformanceOverview {
            requests: agg.count,
            requests_per_minute: agg.count as f64 / effective_minutes(window, span),
            mean_response_ms: agg.mean,
            p95_response_ms: agg.p95,
            p99_response_ms: agg.p99,
            errors,
            error_rate: percent(errors, agg.count),
            database: self.database_summary_at(window, now),
            memory_percent: reading(series::MEMORY),
            cpu_percent: reading(series::CPU),
        }
    }

    pub fn stats(&self, window: Duration) -> StoreStats {
        let now = Utc::now();
        let range = self.time_range();
        StoreStats {
            series_count: self.series_count(),
            sample_count: self.sample_count(),
            oldest_sample: range.map(|(oldest, _)| oldest),
            newest_sample: range.map(|(_, newest)| newest),
            overview: self.performance_overview_at(window, now),
            error_total: self.error_stats_at(window, now).total,
        }
    }
}
