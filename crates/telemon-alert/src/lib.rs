//! Alert rule engine.
//!
//! Rules name a metric type, a condition and a threshold. On every tick
//! the [`engine::AlertEngine`] asks the [`evaluators::EvaluatorRegistry`]
//! for an observation per enabled rule, raises an [`model::Alert`] when the
//! condition holds and no identical firing is suppressed, then walks the
//! rule's escalation policy until the alert is acknowledged or resolved.

pub mod condition;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod evaluators;
pub mod model;
pub mod seed;
pub mod stats;


pub use condition::{evaluate_condition, Condition};
pub use config::AlertConfig;
pub use context::TriggerContext;
pub use engine::AlertEngine;
pub use error::{AlertError, Result};
pub use escalation::{ActionHandler, LoggingActionHandler};
pub use evaluators::{EvaluatorRegistry, MetricEvaluator, Observation};
pub use model::{
    Alert, AlertHistoryEntry, AlertRule, AlertStatus, EscalationAction, EscalationPolicy,
    EscalationStep, HistoryAction, PolicySpec, RuleSpec,
};
pub use stats::AlertStatistics;
