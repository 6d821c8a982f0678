use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use telemon_common::types::MetricSample;

/// Append-only, time-ordered samples of one series.
///
/// Bounded by `max_samples` (FIFO eviction). Timestamps never go
/// backwards: a sample older than the tail is stamped with the tail time,
/// so windows can be located by binary search.
pub struct SeriesBuffer {
    seq: u64,
    max_samples: usize,
    data: VecDeque<MetricSample>,
}

impl SeriesBuffer {
    pub fn new(seq: u64, max_samples: usize) -> Self {
        Self {
            seq,
            max_samples: max_samples.max(1),
            data: VecDeque::new(),
        }
    }

    /// Registration order of the series inside its store.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn push(&mut self, mut sample: MetricSample) -> Option<MetricSample> {
        if let Some(tail) = self.data.back() {
            if sample.timestamp < tail.timestamp {
                sample.timestamp = tail.timestamp;
            }
        }
        let evicted = if self.data.len() >= self.max_samples {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(sample);
        evicted
    }

    /// Drop every sample strictly older than `cutoff`.
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while let Some(front) = self.data.front() {
            if front.timestamp < cutoff {
                self.data.pop_front();
                removed += 1;
            } else {
                break;
            }
        }
        removed
    }

    /// Samples with `start <= timestamp <= end`, oldest first.
    pub fn in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &MetricSample> {
        let first = self.data.partition_point(|s| s.timestamp < start);
        self.data
            .range(first..)
            .take_while(move |s| s.timestamp <= end)
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.data.back()
    }

    pub fn oldest(&self) -> Option<&MetricSample> {
        self.data.front()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
