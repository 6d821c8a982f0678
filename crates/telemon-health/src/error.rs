use thiserror::Error;

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("unknown health probe: {0}")]
    UnknownProbe(String),

    #[error("process metadata unavailable: {0}")]
    ProcessMetadata(String),
}

pub type Result<T> = std::result::Result<T, HealthError>;
