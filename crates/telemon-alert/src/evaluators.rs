//! Per-metric-type evaluation strategies.
//!
//! Each [`MetricEvaluator`] turns the recent samples of one metric family
//! into an [`Observation`]. `Ok(None)` means "no data in the lookback" and
//! never fires.

use crate::condition::{evaluate_condition, Condition};
use crate::context::{EndpointLatency, TriggerContext};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use telemon_health::HealthEvaluator;
use telemon_metrics::report::is_error_status;
use telemon_metrics::{series, MetricsStore};

pub const API_RESPONSE_TIME: &str = "api_response_time";
pub const ERROR_RATE: &str = "error_rate";
pub const ERROR_COUNT: &str = "error_count";
pub const MEMORY_USAGE: &str = "memory_usage";
pub const CPU_USAGE: &str = "cpu_usage";
pub const DATABASE_RESPONSE_TIME: &str = "database_response_time";
pub const SLOW_QUERY_RATE: &str = "slow_query_rate";
pub const HEALTH_STATUS: &str = "health_status";

/// Inputs shared by every evaluation of one rule.
#[derive(Debug, Clone, Copy)]
pub struct EvalInput {
    pub threshold: f64,
    pub condition: Condition,
    pub lookback: Duration,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub value: f64,
    pub context: TriggerContext,
}

#[async_trait]
pub trait MetricEvaluator: Send + Sync {
    fn metric_type(&self) -> &str;

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>>;
}

/// Evaluators keyed by metric type.
#[derive(Default, Clone)]
pub struct EvaluatorRegistry {
    evaluators: BTreeMap<String, Arc<dyn MetricEvaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in metric type. `health_status` is only registered when
    /// a health evaluator is supplied.
    pub fn with_defaults(metrics: Arc<MetricsStore>, health: Option<Arc<HealthEvaluator>>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ApiResponseTime(Arc::clone(&metrics))));
        registry.register(Arc::new(ErrorRate(Arc::clone(&metrics))));
        registry.register(Arc::new(ErrorCount(Arc::clone(&metrics))));
        registry.register(Arc::new(MemoryUsage(Arc::clone(&metrics))));
        registry.register(Arc::new(CpuUsage(Arc::clone(&metrics))));
        registry.register(Arc::new(DatabaseResponseTime(Arc::clone(&metrics))));
        registry.register(Arc::new(SlowQueryRate(metrics)));
        if let Some(health) = health {
            registry.register(Arc::new(HealthRank(health)));
        }
        registry
    }

    /// Register or replace the evaluator for its metric type.
    pub fn register(&mut self, evaluator: Arc<dyn MetricEvaluator>) {
        self.evaluators
            .insert(evaluator.metric_type().to_string(), evaluator);
    }

    pub fn get(&self, metric_type: &str) -> Option<Arc<dyn MetricEvaluator>> {
        self.evaluators.get(metric_type).cloned()
    }

    pub fn contains(&self, metric_type: &str) -> bool {
        self.evaluators.contains_key(metric_type)
    }

    pub fn metric_types(&self) -> Vec<String> {
        self.evaluators.keys().cloned().collect()
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// p95 per endpoint. Reports the first breaching endpoint in registration
/// order, or the first endpoint when none breaches.
struct ApiResponseTime(Arc<MetricsStore>);

#[async_trait]
impl MetricEvaluator for ApiResponseTime {
    fn metric_type(&self) -> &str {
        API_RESPONSE_TIME
    }

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let mut endpoints = Vec::new();
        for name in self.0.series_names(series::API_PREFIX) {
            let agg = self.0.query_at(&name, input.lookback, input.now);
            if !agg.is_empty() {
                endpoints.push(EndpointLatency {
                    endpoint: series::endpoint_of(&name).to_string(),
                    p95_ms: agg.p95,
                });
            }
        }
        let Some(first) = endpoints.first().cloned() else {
            return Ok(None);
        };

        let breaching: Vec<EndpointLatency> = endpoints
            .into_iter()
            .filter(|e| evaluate_condition(e.p95_ms, input.threshold, input.condition))
            .collect();
        let reported = breaching.first().cloned().unwrap_or(first);

        Ok(Some(Observation {
            value: reported.p95_ms,
            context: TriggerContext::Latency {
                endpoint: reported.endpoint,
                p95_ms: reported.p95_ms,
                breaching,
            },
        }))
    }
}

struct ErrorRate(Arc<MetricsStore>);

#[async_trait]
impl MetricEvaluator for ErrorRate {
    fn metric_type(&self) -> &str {
        ERROR_RATE
    }

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let samples = self
            .0
            .samples_with_prefix_at(series::API_PREFIX, input.lookback, input.now);
        if samples.is_empty() {
            return Ok(None);
        }
        let requests = samples.len() as u64;
        let errors = samples.iter().filter(|s| is_error_status(s)).count() as u64;
        let rate = percent(errors, requests);
        Ok(Some(Observation {
            value: rate,
            context: TriggerContext::ErrorRate {
                error_rate_percent: rate,
                errors,
                requests,
            },
        }))
    }
}

struct ErrorCount(Arc<MetricsStore>);

#[async_trait]
impl MetricEvaluator for ErrorCount {
    fn metric_type(&self) -> &str {
        ERROR_COUNT
    }

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let samples = self
            .0
            .samples_with_prefix_at(series::ERROR_PREFIX, input.lookback, input.now);
        if samples.is_empty() {
            return Ok(None);
        }
        let mut by_kind = BTreeMap::new();
        for sample in &samples {
            let kind = sample
                .series
                .strip_prefix(series::ERROR_PREFIX)
                .unwrap_or(&sample.series);
            *by_kind.entry(kind.to_string()).or_insert(0u64) += 1;
        }
        let errors = samples.len() as u64;
        Ok(Some(Observation {
            value: errors as f64,
            context: TriggerContext::ErrorCount { errors, by_kind },
        }))
    }
}

struct MemoryUsage(Arc<MetricsStore>);

#[async_trait]
impl MetricEvaluator for MemoryUsage {
    fn metric_type(&self) -> &str {
        MEMORY_USAGE
    }

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let Some(latest) = self.0.latest_at(series::MEMORY, input.lookback, input.now) else {
            return Ok(None);
        };
        let bytes = |key: &str| latest.tag(key).and_then(|v| v.parse::<u64>().ok());
        Ok(Some(Observation {
            value: latest.value,
            context: TriggerContext::Memory {
                used_bytes: bytes(series::TAG_USED_BYTES),
                total_bytes: bytes(series::TAG_TOTAL_BYTES),
                usage_percent: latest.value,
            },
        }))
    }
}

struct CpuUsage(Arc<MetricsStore>);

#[async_trait]
impl MetricEvaluator for CpuUsage {
    fn metric_type(&self) -> &str {
        CPU_USAGE
    }

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let Some(latest) = self.0.latest_at(series::CPU, input.lookback, input.now) else {
            return Ok(None);
        };
        let load = self
            .0
            .latest_at(series::LOAD, input.lookback, input.now)
            .map(|s| s.value);
        Ok(Some(Observation {
            value: latest.value,
            context: TriggerContext::Cpu {
                usage_percent: latest.value,
                load_average: load,
            },
        }))
    }
}

struct DatabaseResponseTime(Arc<MetricsStore>);

#[async_trait]
impl MetricEvaluator for DatabaseResponseTime {
    fn metric_type(&self) -> &str {
        DATABASE_RESPONSE_TIME
    }

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let summary = self.0.database_summary_at(input.lookback, input.now);
        if summary.queries == 0 {
            return Ok(None);
        }
        Ok(Some(Observation {
            value: summary.p95_ms,
            context: TriggerContext::Database {
                p95_ms: summary.p95_ms,
                slow_query_percent: summary.slow_query_percent,
                queries: summary.queries,
            },
        }))
    }
}

struct SlowQueryRate(Arc<MetricsStore>);

#[async_trait]
impl MetricEvaluator for SlowQueryRate {
    fn metric_type(&self) -> &str {
        SLOW_QUERY_RATE
    }

    async fn evaluate(&self, input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let summary = self.0.database_summary_at(input.lookback, input.now);
        if summary.queries == 0 {
            return Ok(None);
        }
        Ok(Some(Observation {
            value: summary.slow_query_percent,
            context: TriggerContext::Database {
                p95_ms: summary.p95_ms,
                slow_query_percent: summary.slow_query_percent,
                queries: summary.queries,
            },
        }))
    }
}

/// Overall health as a rank: healthy 0, warning 1, critical 2.
struct HealthRank(Arc<HealthEvaluator>);

#[async_trait]
impl MetricEvaluator for HealthRank {
    fn metric_type(&self) -> &str {
        HEALTH_STATUS
    }

    async fn evaluate(&self, _input: &EvalInput) -> anyhow::Result<Option<Observation>> {
        let snapshot = self.0.evaluate().await;
        let rank = snapshot.overall_status.rank().unwrap_or(0);
        Ok(Some(Observation {
            value: f64::from(rank),
            context: TriggerContext::Health {
                status: snapshot.overall_status,
                failing_probes: snapshot.failing_probes(),
            },
        }))
    }
}
