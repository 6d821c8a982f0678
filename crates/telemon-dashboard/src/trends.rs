//! Trend analysis: compares the older and newer halves of a window.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use telemon_common::types::MetricSample;
use telemon_common::window::{self, clamp_window};
use telemon_metrics::report::is_error_status;
use telemon_metrics::store::aggregate_samples;
use telemon_metrics::{series, MetricsStore};

/// Relative change below this percentage is reported as stable.
const STABLE_BAND_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTrend {
    pub metric: String,
    pub previous: f64,
    pub current: f64,
    pub change_percent: f64,
    pub direction: TrendDirection,
}

impl MetricTrend {
    pub fn new(metric: &str, previous: f64, current: f64) -> Self {
        let change_percent = if previous.abs() > f64::EPSILON {
            (current - previous) / previous.abs() * 100.0
        } else if current.abs() > f64::EPSILON {
            100.0 * current.signum()
        } else {
            0.0
        };
        let direction = if change_percent > STABLE_BAND_PERCENT {
            TrendDirection::Rising
        } else if change_percent < -STABLE_BAND_PERCENT {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };
        Self {
            metric: metric.to_string(),
            previous,
            current,
            change_percent,
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub window_secs: i64,
    pub generated_at: DateTime<Utc>,
    pub trends: Vec<MetricTrend>,
}

#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn analyze_trends(&self, window: Duration) -> anyhow::Result<TrendSummary>;
}

/// Trends computed from the metrics store. Unbounded windows are capped
/// at the store's retention.
pub struct MetricsTrendSource {
    metrics: Arc<MetricsStore>,
}

impl MetricsTrendSource {
    pub fn new(metrics: Arc<MetricsStore>) -> Self {
        Self { metrics }
    }

    pub fn analyze_at(&self, window: Duration, now: DateTime<Utc>) -> TrendSummary {
        let retention = window::secs(self.metrics.config().retention_secs);
        let window = clamp_window(window).min(retention);
        let half = window / 2;
        let previous_end = window::window_start(now, half);

        let mut trends = Vec::new();
        let api = |end: DateTime<Utc>| {
            self.metrics
                .samples_with_prefix_at(series::API_PREFIX, half, end)
        };
        let (older, newer) = (api(previous_end), api(now));

        let older_agg = aggregate_samples(&older, half, previous_end);
        let newer_agg = aggregate_samples(&newer, half, now);
        trends.push(MetricTrend::new(
            "requests",
            older_agg.count as f64,
            newer_agg.count as f64,
        ));
        trends.push(MetricTrend::new(
            "response_time_p95_ms",
            older_agg.p95,
            newer_agg.p95,
        ));

        let error_rate = |samples: &[MetricSample]| {
            if samples.is_empty() {
                0.0
            } else {
                samples.iter().filter(|s| is_error_status(s)).count() as f64
                    / samples.len() as f64
                    * 100.0
            }
        };
        trends.push(MetricTrend::new(
            "error_rate_percent",
            error_rate(&older),
            error_rate(&newer),
        ));

        for (metric, name) in [("memory_percent", series::MEMORY), ("cpu_percent", series::CPU)] {
            let previous = self.metrics.query_at(name, half, previous_end).mean;
            let current = self.metrics.query_at(name, half, now).mean;
            trends.push(MetricTrend::new(metric, previous, current));
        }

        TrendSummary {
            window_secs: window.num_seconds(),
            generated_at: now,
            trends,
        }
    }
}

#[async_trait]
impl TrendSource for MetricsTrendSource {
    async fn analyze_trends(&self, window: Duration) -> anyhow::Result<TrendSummary> {
        Ok(self.analyze_at(window, Utc::now()))
    }
}
