//! Alert Rule Engine
//!
//! Evaluates a fixed, ordered table of safety rules against each flight
//! batch, owns the active-alert registry and the bounded alert history, and
//! broadcasts create/resolve notifications.

mod alert;
mod engine;
mod rules;

pub use alert::{squawk_label, Alert, AlertCounts, AlertKey, AlertRule, AlertStatus, Severity};
pub use engine::{AlertEngine, AlertsChanged};
pub use rules::{EngineConfig, RuleThresholds};
