use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Aggregates of the samples inside one window.
///
/// A window without samples yields the all-zero value; `count == 0` means
/// "no data", never failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowedAggregate {
    pub count: u64,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub rate_per_minute: f64,
}

impl WindowedAggregate {
    /// Build from unsorted values. `minutes` is the window length used for
    /// the rate.
    pub fn from_values(mut values: Vec<f64>, minutes: f64) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let sum: f64 = values.iter().sum();
        Self {
            count: count as u64,
            sum,
            mean: sum / count as f64,
            min: values[0],
            max: values[count - 1],
            p50: percentile(&values, 50.0),
            p95: percentile(&values, 95.0),
            p99: percentile(&values, 99.0),
            rate_per_minute: if minutes > 0.0 {
                count as f64 / minutes
            } else {
                0.0
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn field(&self, field: AggregateField) -> f64 {
        match field {
            AggregateField::Count => self.count as f64,
            AggregateField::Sum => self.sum,
            AggregateField::Mean => self.mean,
            AggregateField::Max => self.max,
            AggregateField::P95 => self.p95,
            AggregateField::P99 => self.p99,
        }
    }
}

/// Nearest-rank percentile over ascending `sorted` values.
///
/// `index = ceil(p/100 * n) - 1`, clamped into the slice; empty input is 0.
///
/// # Examples
///
/// ```
/// use telemon_metrics::percentile;
///
/// assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 50.0), 20.0);
/// assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 100.0), 40.0);
/// assert_eq!(percentile(&[], 95.0), 0.0);
/// ```
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let n = sorted.len();
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let rank = (p * n as f64 / 100.0).ceil() as usize;
    sorted[rank.saturating_sub(1).min(n - 1)]
}

/// Aggregate field used to rank series in top-k reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateField {
    Count,
    Sum,
    Mean,
    Max,
    P95,
    P99,
}

impl FromStr for AggregateField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            "mean" | "avg" => Ok(Self::Mean),
            "max" => Ok(Self::Max),
            "p95" => Ok(Self::P95),
            "p99" => Ok(Self::P99),
            _ => Err(format!("unknown aggregate field: {s}")),
        }
    }
}
