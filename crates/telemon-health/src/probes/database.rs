use super::DATABASE;
use crate::probe::{DatabasePing, HealthProbe, ProbeOutcome};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use telemon_common::types::HealthStatus;
use telemon_metrics::MetricsStore;
use tokio::time::Instant;

/// Pings the database and grades recent query statistics.
///
/// A slow-query share above the critical percent wins over a slow ping.
pub struct DatabaseProbe {
    ping: Option<Arc<dyn DatabasePing>>,
    metrics: Arc<MetricsStore>,
    response_warning_ms: f64,
    slow_query_critical_percent: f64,
    stats_window: Duration,
}

impl DatabaseProbe {
    pub fn new(
        ping: Option<Arc<dyn DatabasePing>>,
        metrics: Arc<MetricsStore>,
        response_warning_ms: f64,
        slow_query_critical_percent: f64,
        stats_window: Duration,
    ) -> Self {
        Self {
            ping,
            metrics,
            response_warning_ms,
            slow_query_critical_percent,
            stats_window,
        }
    }
}

#[async_trait]
impl HealthProbe for DatabaseProbe {
    fn name(&self) -> &str {
        DATABASE
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let Some(ping) = &self.ping else {
            return Ok(ProbeOutcome::disabled("No database configured"));
        };

        let started = Instant::now();
        let pinged = ping.ping().await;
        let response_ms = started.elapsed().as_secs_f64() * 1000.0;

        if let Err(e) = pinged {
            return Ok(ProbeOutcome::new(HealthStatus::Critical)
                .with_message(format!("Database ping failed: {e}"))
                .with_detail("response_time_ms", response_ms));
        }

        let summary = self.metrics.database_summary_at(self.stats_window, Utc::now());
        let outcome = ProbeOutcome::healthy()
            .with_detail("response_time_ms", response_ms)
            .with_detail("queries", summary.queries)
            .with_detail("p95_ms", summary.p95_ms)
            .with_detail("slow_query_percent", summary.slow_query_percent);

        if summary.slow_query_percent > self.slow_query_critical_percent {
            let mut outcome = outcome.with_message(format!(
                "{:.1}% of queries are slow",
                summary.slow_query_percent
            ));
            outcome.status = HealthStatus::Critical;
            return Ok(outcome);
        }
        if response_ms > self.response_warning_ms {
            let mut outcome =
                outcome.with_message(format!("Database responded in {response_ms:.0}ms"));
            outcome.status = HealthStatus::Warning;
            return Ok(outcome);
        }
        Ok(outcome)
    }
}
