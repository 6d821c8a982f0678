//! Windowed in-memory metrics store.
//!
//! Samples are appended to per-series ring buffers held in a sharded map,
//! so writers on different series never contend and writers on the same
//! series only contend on that series' mutex. Aggregates are computed on
//! query from the samples inside `[now - window, now]`; nothing derived is
//! stored.

pub mod aggregate;
pub mod buffer;
pub mod config;
pub mod report;
pub mod series;
pub mod store;

#[cfg(test)]
mod tests;

pub use aggregate::{percentile, AggregateField, WindowedAggregate};
pub use config::MetricsConfig;
pub use store::MetricsStore;
