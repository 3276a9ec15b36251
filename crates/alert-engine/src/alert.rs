//! Alert Types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Alert severity. Variant order is display order, most severe first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// The safety rules evaluated each cycle.
///
/// Keys are disjoint: several rules can be active for one aircraft at the
/// same time, each as its own alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertRule {
    EmergencySquawk,
    RapidDescent,
    GroundProximity,
    LowAltitude,
    ExcessiveSpeed,
    SignalLost,
}

/// Lifecycle state of one alert instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

/// Registry key: at most one active alert per aircraft per rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub icao24: String,
    pub rule: AlertRule,
}

/// A raised safety alert.
///
/// Mutable while active: position, altitude, message, and `updated_at`
/// refresh on every cycle the condition persists. A resolved instance is
/// terminal; the same aircraft re-triggering the same rule later creates a
/// new instance with a fresh id and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Per-instance id.
    pub id: Uuid,
    pub icao24: String,
    pub rule: AlertRule,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub callsign: Option<String>,
    pub origin_country: String,
    /// Last known position.
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: Option<i32>,
    pub ground_speed_kt: Option<i32>,
    pub squawk: Option<String>,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Registry key for this alert.
    pub fn key(&self) -> AlertKey {
        AlertKey {
            icao24: self.icao24.clone(),
            rule: self.rule,
        }
    }
}

/// Active alert totals by severity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertCounts {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
}

/// Meaning of a reserved emergency squawk code.
pub fn squawk_label(code: &str) -> &'static str {
    match code {
        "7500" => "Hijack / Unlawful Interference",
        "7600" => "Radio Communication Failure",
        "7700" => "General Emergency",
        _ => "Unknown emergency",
    }
}
