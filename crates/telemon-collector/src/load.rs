use crate::Collector;
use anyhow::Result;
use chrono::Utc;
use sysinfo::System;
use telemon_common::types::{tags, MetricSample};
use telemon_metrics::series;

pub struct LoadCollector;

impl LoadCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoadCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for LoadCollector {
    fn name(&self) -> &str {
        "load"
    }

    /// One-minute load as the value; five and fifteen minute loads as tags.
    fn collect(&mut self) -> Result<Vec<MetricSample>> {
        let load = System::load_average();
        let five = format!("{:.2}", load.five);
        let fifteen = format!("{:.2}", load.fifteen);
        Ok(vec![MetricSample {
            series: series::LOAD.to_string(),
            timestamp: Utc::now(),
            value: load.one,
            tags: tags(&[("load_5", five.as_str()), ("load_15", fifteen.as_str())]),
        }])
    }
}
