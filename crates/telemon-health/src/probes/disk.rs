use super::DISK;
use crate::probe::{HealthProbe, ProbeOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use telemon_common::types::HealthStatus;

/// Checks that the working directory and the configured writable paths
/// are reachable.
pub struct DiskProbe {
    writable_paths: Vec<PathBuf>,
}

impl DiskProbe {
    pub fn new(writable_paths: Vec<PathBuf>) -> Self {
        Self { writable_paths }
    }
}

async fn writable(path: &Path) -> std::io::Result<()> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ));
    }
    Ok(())
}

#[async_trait]
impl HealthProbe for DiskProbe {
    fn name(&self) -> &str {
        DISK
    }

    async fn check(&self) -> anyhow::Result<ProbeOutcome> {
        let cwd = match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(e) => {
                return Ok(ProbeOutcome::new(HealthStatus::Critical)
                    .with_message(format!("Working directory unavailable: {e}")));
            }
        };
        if let Err(e) = tokio::fs::read_dir(&cwd).await {
            return Ok(ProbeOutcome::new(HealthStatus::Critical)
                .with_message(format!("Working directory {} inaccessible: {e}", cwd.display()))
                .with_detail("cwd", cwd.display().to_string()));
        }

        let mut failed = Vec::new();
        for path in &self.writable_paths {
            if let Err(e) = writable(path).await {
                failed.push(format!("{}: {e}", path.display()));
            }
        }

        let outcome = ProbeOutcome::healthy()
            .with_detail("cwd", cwd.display().to_string())
            .with_detail("checked_paths", self.writable_paths.len());
        if failed.is_empty() {
            return Ok(outcome);
        }
        let mut outcome = outcome
            .with_message(format!("{} path(s) not writable", failed.len()))
            .with_detail(
                "failed_paths",
                Value::from(failed.into_iter().map(Value::from).collect::<Vec<_>>()),
            );
        outcome.status = HealthStatus::Warning;
        Ok(outcome)
    }
}
