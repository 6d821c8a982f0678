//! Resource collection for the telemon engine.
//!
//! Each [`Collector`] gathers one category of host metrics (memory, CPU,
//! load) and returns them as [`MetricSample`]s named after the store's
//! `system:` series. [`ResourceSource`] is the point-in-time view the
//! health probes and alert context read from.

pub mod cpu;
pub mod load;
pub mod memory;
pub mod resources;

use anyhow::Result;
use telemon_common::types::MetricSample;
use telemon_metrics::MetricsStore;

pub use cpu::CpuCollector;
pub use load::LoadCollector;
pub use memory::MemoryCollector;
pub use resources::{LoadAverage, ResourceSnapshot, ResourceSource, SystemResources};

/// A host metric collector polled by the resource sampler.
///
/// `Send + Sync` so the sampler can own a set of collectors inside a
/// spawned task.
pub trait Collector: Send + Sync {
    /// Collector name (e.g. `"cpu"`), used for logging.
    fn name(&self) -> &str;

    /// Current values.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn collect(&mut self) -> Result<Vec<MetricSample>>;
}

/// The default collector set: memory, CPU and load.
pub fn default_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(MemoryCollector::new()),
        Box::new(CpuCollector::new()),
        Box::new(LoadCollector::new()),
    ]
}

/// Run every collector once and append the results to `store`.
///
/// A failing collector is logged and skipped. Returns the number of samples
/// recorded.
pub fn sample_into(store: &MetricsStore, collectors: &mut [Box<dyn Collector>]) -> usize {
    let mut recorded = 0;
    for collector in collectors.iter_mut() {
        match collector.collect() {
            Ok(samples) => {
                for sample in samples {
                    store.record_at(&sample.series, sample.value, sample.tags, sample.timestamp);
                    recorded += 1;
                }
            }
            Err(e) => {
                tracing::warn!(collector = collector.name(), error = %e, "Collector failed");
            }
        }
    }
    recorded
}

#[cfg(test)]
mod tests;
