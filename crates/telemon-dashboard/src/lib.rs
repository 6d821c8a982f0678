//! Read-only dashboard views composed from the metrics store, the health
//! evaluator and the alert engine.
//!
//! Top-level views are cached per `(view, window)` for a short TTL. Nothing
//! invalidates an entry early except [`DashboardAggregator::clear_cache`].

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod trends;
pub mod views;

#[cfg(test)]
mod tests;

pub use aggregator::DashboardAggregator;
pub use cache::{CacheStats, ViewCache, ViewKind};
pub use config::DashboardConfig;
pub use error::{DashboardError, Result};
pub use trends::{MetricTrend, MetricsTrendSource, TrendDirection, TrendSource, TrendSummary};
pub use views::{
    AlertOverview, ClientInfo, DashboardSettings, DashboardView, EndpointLatency, RealtimeMetrics,
    RegisteredClient,
};
