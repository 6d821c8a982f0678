use super::{grade_usage, CPU};
use crate::probe::{HealthProbe, ProbeOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use telemon_collector::ResourceSource;
use telemon_common::types::HealthStatus;

pub struct CpuProbe {
    source: Arc<dyn ResourceSource>,
    threshold: f64,
    warning_ratio: f64,
}

impl CpuProbe {
    pub fn new(source: Arc<dyn ResourceSource>, threshold: f64, warning_ratio: f64) -> Self {
        Self {
            source,
            threshold,
            warning_ratio,
        }
    }
}

#[async_trait]
impl HealthProbe for CpuProbe {
    fn name(&self) -> &str {
        CPU
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let snapshot = self.source.snapshot()?;
        let usage = snapshot.cpu_percent;
        let status = grade_usage(usage, self.threshold, self.warning_ratio);

        let mut outcome = ProbeOutcome::new(status)
            .with_detail("usage_percent", usage)
            .with_detail("cpu_count", snapshot.cpu_count)
            .with_detail("load_1", snapshot.load_average.one)
            .with_detail("load_5", snapshot.load_average.five)
            .with_detail("load_15", snapshot.load_average.fifteen);
        if status != HealthStatus::Healthy {
            outcome = outcome.with_message(format!("CPU usage at {usage:.1}%"));
        }
        Ok(outcome)
    }
}
