use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("dashboard client not found: {0}")]
    ClientNotFound(String),

    #[error("invalid dashboard client: {0}")]
    InvalidClient(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
