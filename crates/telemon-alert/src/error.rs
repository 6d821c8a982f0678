use thiserror::Error;

/// Errors returned by administrative alert operations.
///
/// # Examples
///
/// ```
/// use telemon_alert::AlertError;
///
/// let err = AlertError::RuleNotFound("high-cpu".to_string());
/// assert!(err.to_string().contains("high-cpu"));
/// ```
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert rule not found: {0}")]
    RuleNotFound(String),

    #[error("escalation policy not found: {0}")]
    PolicyNotFound(String),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("alert rule already exists: {0}")]
    DuplicateRule(String),

    #[error("escalation policy already exists: {0}")]
    DuplicatePolicy(String),

    /// The alert is not in a state that allows the requested transition.
    #[error("alert {id} cannot be {action}: status is {status}")]
    InvalidTransition {
        id: String,
        action: &'static str,
        status: String,
    },

    #[error("escalation policy {0} is referenced by a rule")]
    PolicyInUse(String),

    #[error("invalid alert rule: {0}")]
    InvalidRule(String),

    #[error("invalid escalation policy: {0}")]
    InvalidPolicy(String),

    #[error("unknown metric type: {0}")]
    UnknownMetricType(String),
}

pub type Result<T> = std::result::Result<T, AlertError>;
