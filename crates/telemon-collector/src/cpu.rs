use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;
use sysinfo::System;
use telemon_common::types::MetricSample;
use telemon_metrics::series;

/// Global CPU usage. The first reading after construction primes sysinfo's
/// delta, so the collector refreshes once up front.
pub struct CpuCollector {
    system: System,
}

impl CpuCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        Self { system }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn collect(&mut self) -> Result<Vec<MetricSample>> {
        self.system.refresh_cpu_all();
        Ok(vec![MetricSample {
            series: series::CPU.to_string(),
            timestamp: Utc::now(),
            value: f64::from(self.system.global_cpu_usage()).clamp(0.0, 100.0),
            tags: BTreeMap::new(),
        }])
    }
}
