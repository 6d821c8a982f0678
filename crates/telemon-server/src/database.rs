use anyhow::{bail, Context};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use telemon_health::DatabasePing;
use tokio::net::TcpStream;

/// Database liveness check: a TCP connect to the server's address.
pub struct TcpDatabasePing {
    address: String,
}

impl TcpDatabasePing {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl DatabasePing for TcpDatabasePing {
    async fn ping(&self) -> anyhow::Result<()> {
        TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("connect to {} failed", self.address))?;
        Ok(())
    }
}

/// Bounds any ping by the configured connect timeout.
pub struct TimedPing {
    inner: Arc<dyn DatabasePing>,
    timeout: Duration,
}

impl TimedPing {
    pub fn new(inner: Arc<dyn DatabasePing>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl DatabasePing for TimedPing {
    async fn ping(&self) -> anyhow::Result<()> {
        match tokio::time::timeout(self.timeout, self.inner.ping()).await {
            Ok(result) => result,
            Err(_) => bail!("database ping timed out after {}ms", self.timeout.as_millis()),
        }
    }
}
