use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One recorded value of a series.
///
/// Samples are immutable once recorded; the store hands out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub series: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub tags: BTreeMap<String, String>,
}

impl MetricSample {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Build a tag map from borrowed pairs.
///
/// # Examples
///
/// ```
/// use telemon_common::types::tags;
///
/// let t = tags(&[("method", "GET"), ("status", "200")]);
/// assert_eq!(t.get("status").map(String::as_str), Some("200"));
/// ```
pub fn tags(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Render tags as `k=v, k=v` in key order.
pub fn format_tags(tags: &BTreeMap<String, String>) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use telemon_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Result of one health probe, or the combined status of a snapshot.
///
/// `Disabled` never takes part in combination: [`HealthStatus::worst`]
/// skips it and a set made only of disabled results is healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Disabled,
}

impl HealthStatus {
    /// Precedence rank: healthy 0, warning 1, critical 2. Disabled has none.
    pub fn rank(self) -> Option<u8> {
        match self {
            HealthStatus::Healthy => Some(0),
            HealthStatus::Warning => Some(1),
            HealthStatus::Critical => Some(2),
            HealthStatus::Disabled => None,
        }
    }

    /// Worst non-disabled status of `statuses`, `Healthy` when there is none.
    ///
    /// # Examples
    ///
    /// ```
    /// use telemon_common::types::HealthStatus::*;
    /// use telemon_common::types::HealthStatus;
    ///
    /// assert_eq!(HealthStatus::worst([Healthy, Warning, Disabled]), Warning);
    /// assert_eq!(HealthStatus::worst([Disabled]), Healthy);
    /// ```
    pub fn worst<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses
            .into_iter()
            .filter_map(|s| s.rank().map(|r| (r, s)))
            .max_by_key(|(r, _)| *r)
            .map(|(_, s)| s)
            .unwrap_or(HealthStatus::Healthy)
    }

    pub fn is_critical(self) -> bool {
        self == HealthStatus::Critical
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
            HealthStatus::Disabled => write!(f, "disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_prefers_critical() {
        use HealthStatus::*;
        assert_eq!(HealthStatus::worst([Warning, Critical, Healthy]), Critical);
        assert_eq!(HealthStatus::worst([Healthy, Healthy]), Healthy);
        assert_eq!(HealthStatus::worst([Critical, Disabled]), Critical);
        assert_eq!(HealthStatus::worst(Vec::new()), Healthy);
    }

    #[test]
    fn format_tags_is_key_ordered() {
        let t = tags(&[("z", "1"), ("a", "2")]);
        assert_eq!(format_tags(&t), "a=2, z=1");
    }

    #[test]
    fn severity_rejects_unknown() {
        assert!("fatal".parse::<Severity>().is_err());
        assert_eq!("CRITICAL".parse::<Severity>(), Ok(Severity::Critical));
    }
}
