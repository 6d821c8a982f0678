use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use telemon_common::types::HealthStatus;

/// Verdict of one probe run, before the evaluator stamps name and timing.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub details: BTreeMap<String, Value>,
}

impl ProbeOutcome {
    pub fn new(status: HealthStatus) -> Self {
        Self {
            status,
            message: None,
            details: BTreeMap::new(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy)
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::new(HealthStatus::Disabled).with_message(reason)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// One named health check.
///
/// An `Err` from [`check`](HealthProbe::check) is reported as a critical
/// result carrying the error message; it never aborts an evaluation.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> anyhow::Result<ProbeOutcome>;
}

/// Cheap database liveness check.
#[async_trait]
pub trait DatabasePing: Send + Sync {
    async fn ping(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationStatus {
    pub name: String,
    pub enabled: bool,
    /// Configuration or connectivity problem, if any.
    pub error: Option<String>,
}

/// Reports the state of external integrations.
pub trait IntegrationSource: Send + Sync {
    fn integrations(&self) -> Vec<IntegrationStatus>;
}
