use super::{grade_usage, MEMORY};
use crate::probe::{HealthProbe, ProbeOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use telemon_collector::ResourceSource;
use telemon_common::types::HealthStatus;

pub struct MemoryProbe {
    source: Arc<dyn ResourceSource>,
    threshold: f64,
    warning_ratio: f64,
}

impl MemoryProbe {
    pub fn new(source: Arc<dyn ResourceSource>, threshold: f64, warning_ratio: f64) -> Self {
        Self {
            source,
            threshold,
            warning_ratio,
        }
    }
}

#[async_trait]
impl HealthProbe for MemoryProbe {
    fn name(&self) -> &str {
        MEMORY
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let snapshot = self.source.snapshot()?;
        let usage = snapshot.memory_percent;
        let status = grade_usage(usage, self.threshold, self.warning_ratio);

        let mut outcome = ProbeOutcome::new(status)
            .with_detail("usage_percent", usage)
            .with_detail("used_bytes", snapshot.memory_used_bytes)
            .with_detail("total_bytes", snapshot.memory_total_bytes)
            .with_detail("threshold_percent", self.threshold);
        if status != HealthStatus::Healthy {
            outcome = outcome.with_message(format!("Memory usage at {usage:.1}%"));
        }
        Ok(outcome)
    }
}
