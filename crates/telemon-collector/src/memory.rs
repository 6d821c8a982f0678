use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use sysinfo::System;
use telemon_common::types::{tags, MetricSample};
use telemon_metrics::series;

pub struct MemoryCollector {
    system: System,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Used share of `total` in percent; 0 when the total is unknown.
pub fn usage_percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        (used as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn collect(&mut self) -> Result<Vec<MetricSample>> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        let used_str = used.to_string();
        let total_str = total.to_string();

        Ok(vec![MetricSample {
            series: series::MEMORY.to_string(),
            timestamp: Utc::now(),
            value: usage_percent(used, total),
            tags: tags(&[
                (series::TAG_USED_BYTES, used_str.as_str()),
                (series::TAG_TOTAL_BYTES, total_str.as_str()),
            ]),
        }])
    }
}
