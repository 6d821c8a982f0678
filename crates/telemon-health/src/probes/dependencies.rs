use super::DEPENDENCIES;
use crate::config::IntegrationConfig;
use crate::probe::{HealthProbe, IntegrationSource, IntegrationStatus, ProbeOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use telemon_common::types::HealthStatus;

/// Integrations declared in config, checked for their required
/// environment variables.
pub struct EnvIntegrations {
    integrations: Vec<IntegrationConfig>,
}

impl EnvIntegrations {
    pub fn new(integrations: Vec<IntegrationConfig>) -> Self {
        Self { integrations }
    }
}

impl IntegrationSource for EnvIntegrations {
    fn integrations(&self) -> Vec<IntegrationStatus> {
        self.integrations
            .iter()
            .map(|integration| {
                let missing: Vec<&str> = integration
                    .required_env
                    .iter()
                    .filter(|var| std::env::var(var.as_str()).map_or(true, |v| v.is_empty()))
                    .map(String::as_str)
                    .collect();
                IntegrationStatus {
                    name: integration.name.clone(),
                    enabled: integration.enabled,
                    error: (!missing.is_empty())
                        .then(|| format!("missing environment: {}", missing.join(", "))),
                }
            })
            .collect()
    }
}

pub struct DependenciesProbe {
    source: Option<Arc<dyn IntegrationSource>>,
}

impl DependenciesProbe {
    pub fn new(source: Option<Arc<dyn IntegrationSource>>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl HealthProbe for DependenciesProbe {
    fn name(&self) -> &str {
        DEPENDENCIES
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let integrations = match &self.source {
            Some(source) => source.integrations(),
            None => Vec::new(),
        };
        let enabled: Vec<&IntegrationStatus> = integrations.iter().filter(|i| i.enabled).collect();
        if enabled.is_empty() {
            return Ok(ProbeOutcome::disabled("No integrations enabled"));
        }

        let mut details = serde_json::Map::new();
        let mut failing = Vec::new();
        for integration in &enabled {
            let state = match &integration.error {
                Some(err) => {
                    failing.push(integration.name.clone());
                    err.clone()
                }
                None => "ok".to_string(),
            };
            details.insert(integration.name.clone(), Value::from(state));
        }

        let mut outcome =
            ProbeOutcome::healthy().with_detail("integrations", Value::Object(details));
        if !failing.is_empty() {
            outcome = outcome.with_message(format!("Integration problems: {}", failing.join(", ")));
            outcome.status = HealthStatus::Warning;
        }
        Ok(outcome)
    }
}
