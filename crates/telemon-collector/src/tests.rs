use crate::memory::usage_percent;
use crate::{
    default_collectors, sample_into, Collector, CpuCollector, LoadCollector, MemoryCollector,
    ResourceSource, SystemResources,
};
use anyhow::{bail, Result};
use chrono::Duration;
use telemon_common::types::MetricSample;
use telemon_metrics::{series, MetricsStore};

struct Broken;

impl Collector for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn collect(&mut self) -> Result<Vec<MetricSample>> {
        bail!("permission denied")
    }
}

#[test]
fn memory_collector_reports_percent_with_byte_tags() {
    let mut collector = MemoryCollector::new();
    let samples = collector.collect().expect("memory readable");
    assert_eq!(samples.len(), 1);
    let sample = &samples[0];
    assert_eq!(sample.series, series::MEMORY);
    assert!((0.0..=100.0).contains(&sample.value));
    assert!(sample.tag(series::TAG_TOTAL_BYTES).is_some());
}

#[test]
fn cpu_collector_stays_in_percent_range() {
    let mut collector = CpuCollector::new();
    let samples = collector.collect().expect("cpu readable");
    assert_eq!(samples[0].series, series::CPU);
    assert!((0.0..=100.0).contains(&samples[0].value));
}

#[test]
fn load_collector_tags_longer_averages() {
    let mut collector = LoadCollector::new();
    let samples = collector.collect().expect("load readable");
    assert_eq!(samples[0].series, series::LOAD);
    assert!(samples[0].tag("load_5").is_some());
    assert!(samples[0].tag("load_15").is_some());
}

#[test]
fn sample_into_skips_failing_collectors() {
    let store = MetricsStore::default();
    let mut collectors = default_collectors();
    collectors.push(Box::new(Broken));

    let recorded = sample_into(&store, &mut collectors);
    assert_eq!(recorded, 3);
    assert_eq!(store.query(series::MEMORY, Duration::minutes(1)).count, 1);
    assert_eq!(store.query(series::CPU, Duration::minutes(1)).count, 1);
}

#[test]
fn system_snapshot_is_consistent() {
    let source = SystemResources::new();
    let snapshot = source.snapshot().expect("snapshot readable");
    assert!(snapshot.memory_used_bytes <= snapshot.memory_total_bytes);
    assert!((0.0..=100.0).contains(&snapshot.memory_percent));
    assert!(snapshot.cpu_count >= 1);
}

#[test]
fn usage_percent_handles_zero_total() {
    assert_eq!(usage_percent(5, 0), 0.0);
    assert_eq!(usage_percent(1, 4), 25.0);
}
