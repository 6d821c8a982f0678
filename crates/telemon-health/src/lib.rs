//! Health evaluation for the telemon engine.
//!
//! A [`HealthEvaluator`] owns a fixed set of named [`HealthProbe`]s. Every
//! evaluation reruns all of them under a timeout, combines the results into
//! one overall status and appends the snapshot to a bounded history.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod probe;
pub mod probes;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use config::{HealthConfig, IntegrationConfig};
pub use error::{HealthError, Result};
pub use evaluator::HealthEvaluator;
pub use probe::{DatabasePing, HealthProbe, IntegrationSource, IntegrationStatus, ProbeOutcome};
pub use snapshot::{
    Capacity, HealthCheckResult, HealthSnapshot, HistorySummary, Liveness, Readiness,
    StatusReport, SummaryCounts,
};
