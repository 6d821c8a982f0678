use crate::aggregate::{AggregateField, WindowedAggregate};
use crate::buffer::SeriesBuffer;
use crate::config::MetricsConfig;
use crate::series;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use telemon_common::types::MetricSample;
use telemon_common::window::{self, effective_minutes, window_start};

pub struct MetricsStore {
    config: MetricsConfig,
    series: DashMap<String, Mutex<SeriesBuffer>>,
    next_seq: AtomicU64,
}

impl MetricsStore {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            series: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    pub fn record(&self, series: &str, value: f64, tags: BTreeMap<String, String>) {
        self.record_at(series, value, tags, Utc::now());
    }

    /// Append a sample with an explicit timestamp.
    ///
    /// Non-finite values are dropped: ingestion never fails.
    pub fn record_at(
        &self,
        series: &str,
        value: f64,
        tags: BTreeMap<String, String>,
        timestamp: DateTime<Utc>,
    ) {
        if !value.is_finite() {
            tracing::debug!(series, value, "Dropping non-finite sample");
            return;
        }
        let sample = MetricSample {
            series: series.to_string(),
            timestamp,
            value,
            tags,
        };

        // Fast path holds only the shard read lock, so the eviction sweep
        // (which needs the write lock to drop empty series) cannot orphan
        // this buffer mid-push.
        if let Some(buffer) = self.series.get(series) {
            buffer.lock().push(sample);
            return;
        }

        let max_samples = self.config.max_samples_per_series;
        self.series
            .entry(series.to_string())
            .or_insert_with(|| {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                Mutex::new(SeriesBuffer::new(seq, max_samples))
            })
            .lock()
            .push(sample);
    }

    pub fn query(&self, series: &str, window: Duration) -> WindowedAggregate {
        self.query_at(series, window, Utc::now())
    }

    pub fn query_at(
        &self,
        series: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> WindowedAggregate {
        let samples = self.samples_at(series, window, now);
        aggregate_samples(&samples, window, now)
    }

    /// In-window samples of `series`, oldest first.
    pub fn samples(&self, series: &str, window: Duration) -> Vec<MetricSample> {
        self.samples_at(series, window, Utc::now())
    }

    pub fn samples_at(
        &self,
        series: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Vec<MetricSample> {
        let start = window_start(now, window);
        match self.series.get(series) {
            Some(buffer) => buffer.lock().in_window(start, now).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Samples of every series starting with `prefix`, concatenated in
    /// series registration order.
    pub fn samples_with_prefix_at(
        &self,
        prefix: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Vec<MetricSample> {
        self.series_names(prefix)
            .iter()
            .flat_map(|name| self.samples_at(name, window, now))
            .collect()
    }

    /// Most recent sample of `series` inside the window, if any.
    pub fn latest_at(
        &self,
        series: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Option<MetricSample> {
        let start = window_start(now, window);
        let buffer = self.series.get(series)?;
        let guard = buffer.lock();
        guard
            .latest()
            .filter(|s| s.timestamp >= start && s.timestamp <= now)
            .cloned()
    }

    /// Series names starting with `prefix`, in registration order.
    pub fn series_names(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<(u64, String)> = self
            .series
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (entry.value().lock().seq(), entry.key().clone()))
            .collect();
        names.sort_by_key(|(seq, _)| *seq);
        names.into_iter().map(|(_, name)| name).collect()
    }

    pub fn top_k(
        &self,
        prefix: &str,
        window: Duration,
        by: AggregateField,
        k: usize,
    ) -> Vec<(String, WindowedAggregate)> {
        self.top_k_at(prefix, window, by, k, Utc::now())
    }

    /// Series under `prefix` ranked by `by`, descending. Series without
    /// in-window data are skipped; ties go to the smaller name.
    pub fn top_k_at(
        &self,
        prefix: &str,
        window: Duration,
        by: AggregateField,
        k: usize,
        now: DateTime<Utc>,
    ) -> Vec<(String, WindowedAggregate)> {
        let mut ranked: Vec<(String, WindowedAggregate)> = self
            .series_names(prefix)
            .into_iter()
            .map(|name| {
                let agg = self.query_at(&name, window, now);
                (name, agg)
            })
            .filter(|(_, agg)| !agg.is_empty())
            .collect();
        ranked.sort_by(|(a_name, a), (b_name, b)| {
            b.field(by)
                .total_cmp(&a.field(by))
                .then_with(|| a_name.cmp(b_name))
        });
        ranked.truncate(k);
        ranked
    }

    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    /// Drop samples older than the retention horizon, then drop series left
    /// empty. Returns the number of samples removed.
    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = window_start(now, window::secs(self.config.retention_secs));

        let removed: usize = self
            .series
            .iter()
            .map(|entry| entry.value().lock().evict_before(cutoff))
            .sum();

        let before = self.series.len();
        self.series.retain(|_, buffer| !buffer.get_mut().is_empty());
        let dropped_series = before.saturating_sub(self.series.len());

        if removed > 0 || dropped_series > 0 {
            tracing::debug!(removed, dropped_series, "Evicted expired samples");
        }
        removed
    }

    pub fn reset(&self) {
        self.series.clear();
        tracing::info!("Metrics store reset");
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    pub fn sample_count(&self) -> usize {
        self.series
            .iter()
            .map(|entry| entry.value().lock().len())
            .sum()
    }

    /// Timestamps of the oldest and newest retained samples.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.series
            .iter()
            .filter_map(|entry| {
                let guard = entry.value().lock();
                Some((guard.oldest()?.timestamp, guard.latest()?.timestamp))
            })
            .reduce(|(lo, hi), (o, n)| (lo.min(o), hi.max(n)))
    }

    pub fn record_api_response(&self, method: &str, path: &str, status: u16, duration_ms: f64) {
        let status = status.to_string();
        let method = method.to_ascii_uppercase();
        self.record(
            &series::api_series(&method, path),
            duration_ms,
            telemon_common::types::tags(&[
                (series::TAG_METHOD, method.as_str()),
                (series::TAG_PATH, path),
                (series::TAG_STATUS, status.as_str()),
            ]),
        );
    }

    pub fn record_db_query(&self, query: &str, duration_ms: f64) {
        let query = series::clip(query);
        self.record(
            series::DB_QUERY,
            duration_ms,
            telemon_common::types::tags(&[(series::TAG_QUERY, query.as_str())]),
        );
    }

    pub fn record_error(&self, kind: &str, message: &str) {
        let message = series::clip(message);
        self.record(
            &series::error_series(kind),
            1.0,
            telemon_common::types::tags(&[(series::TAG_MESSAGE, message.as_str())]),
        );
    }

    pub fn record_memory(&self, used_bytes: u64, total_bytes: u64) {
        let percent = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            0.0
        };
        let used = used_bytes.to_string();
        let total = total_bytes.to_string();
        self.record(
            series::MEMORY,
            percent,
            telemon_common::types::tags(&[
                (series::TAG_USED_BYTES, used.as_str()),
                (series::TAG_TOTAL_BYTES, total.as_str()),
            ]),
        );
    }

    pub fn record_cpu(&self, usage_percent: f64) {
        self.record(series::CPU, usage_percent, BTreeMap::new());
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

/// Aggregate already-filtered samples of a window ending at `now`.
pub fn aggregate_samples(
    samples: &[MetricSample],
    window: Duration,
    now: DateTime<Utc>,
) -> WindowedAggregate {
    let span = samples
        .first()
        .map(|s| now - s.timestamp)
        .unwrap_or_else(Duration::zero);
    let values = samples.iter().map(|s| s.value).collect();
    WindowedAggregate::from_values(values, effective_minutes(window, span))
}
