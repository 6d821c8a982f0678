use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Comparison applied as `observed <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = ">", alias = "gt", alias = "greater_than")]
    GreaterThan,
    #[serde(rename = "<", alias = "lt", alias = "less_than")]
    LessThan,
    #[serde(rename = "=", alias = "eq", alias = "equal")]
    Equal,
    #[serde(rename = "!=", alias = "ne", alias = "not_equal")]
    NotEqual,
    #[serde(rename = ">=", alias = "gte", alias = "greater_equal")]
    GreaterEqual,
    #[serde(rename = "<=", alias = "lte", alias = "less_equal")]
    LessEqual,
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" | "gt" | "greater_than" => Ok(Self::GreaterThan),
            "<" | "lt" | "less_than" => Ok(Self::LessThan),
            "=" | "==" | "eq" | "equal" => Ok(Self::Equal),
            "!=" | "ne" | "not_equal" => Ok(Self::NotEqual),
            ">=" | "gte" | "greater_equal" => Ok(Self::GreaterEqual),
            "<=" | "lte" | "less_equal" => Ok(Self::LessEqual),
            _ => Err(format!("unknown condition: {s}")),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, ">"),
            Self::LessThan => write!(f, "<"),
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterEqual => write!(f, ">="),
            Self::LessEqual => write!(f, "<="),
        }
    }
}

impl Condition {
    pub fn check(self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => observed > threshold,
            Self::LessThan => observed < threshold,
            Self::Equal => (observed - threshold).abs() <= f64::EPSILON,
            Self::NotEqual => (observed - threshold).abs() > f64::EPSILON,
            Self::GreaterEqual => observed >= threshold,
            Self::LessEqual => observed <= threshold,
        }
    }

    /// Wording used in alert messages.
    pub fn describe(self) -> &'static str {
        match self {
            Self::GreaterThan => "above",
            Self::LessThan => "below",
            Self::Equal => "equal to",
            Self::NotEqual => "not equal to",
            Self::GreaterEqual => "at or above",
            Self::LessEqual => "at or below",
        }
    }
}

/// `observed <condition> threshold`. NaN never satisfies a condition.
///
/// # Examples
///
/// ```
/// use telemon_alert::condition::{evaluate_condition, Condition};
///
/// assert!(!evaluate_condition(90.0, 90.0, Condition::GreaterThan));
/// assert!(evaluate_condition(91.0, 90.0, Condition::GreaterThan));
/// assert!(evaluate_condition(90.0, 90.0, Condition::GreaterEqual));
/// ```
pub fn evaluate_condition(observed: f64, threshold: f64, condition: Condition) -> bool {
    if observed.is_nan() || threshold.is_nan() {
        return false;
    }
    condition.check(observed, threshold)
}
