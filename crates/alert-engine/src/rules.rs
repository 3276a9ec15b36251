//! Safety Rule Table
//!
//! Fixed, ordered evaluation of safety conditions for one airborne flight.
//! Grounded aircraft are exempt from every rule. Evaluation is pure numeric
//! comparison over already-normalized fields and has no failure path.

use flight_data::Flight;
use serde::{Deserialize, Serialize};

use crate::alert::{squawk_label, AlertRule, Severity};

/// Per-rule numeric thresholds, each independently tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Transponder codes that signal an emergency.
    pub emergency_squawks: Vec<String>,
    /// Vertical rate below this fires a rapid-descent alert (ft/min).
    pub rapid_descent_ftmin: i32,
    /// Altitude floor for the low-altitude warning (ft).
    pub low_altitude_ft: i32,
    /// Altitude floor for the ground-proximity alert (ft).
    pub ground_proximity_ft: i32,
    /// Descent-rate gate for the ground-proximity alert (ft/min).
    pub ground_proximity_descent_ftmin: i32,
    /// Ground-speed ceiling (kt).
    pub excessive_speed_kt: i32,
    /// Seconds without contact before the signal is considered lost.
    pub signal_lost_secs: i64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            emergency_squawks: vec![
                "7500".to_string(),
                "7600".to_string(),
                "7700".to_string(),
            ],
            rapid_descent_ftmin: -1_500,
            low_altitude_ft: 3_000,
            ground_proximity_ft: 1_500,
            ground_proximity_descent_ftmin: -800,
            excessive_speed_kt: 680,
            signal_lost_secs: 60,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: RuleThresholds,
    /// Alert history capacity, entries.
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: RuleThresholds::default(),
            history_capacity: alert_history::DEFAULT_CAPACITY,
        }
    }
}

/// One rule that fired for a flight this cycle.
#[derive(Debug)]
pub(crate) struct Firing {
    pub rule: AlertRule,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

fn position_text(flight: &Flight) -> String {
    format!("{:.2}N {:.2}E", flight.latitude, flight.longitude)
}

/// Evaluate the rule table for one flight.
///
/// The ground-proximity and low-altitude checks are a single if/else-if
/// pair: a flight meeting the stricter descending condition never also
/// receives the plain low-altitude warning in the same cycle.
pub(crate) fn evaluate(flight: &Flight, now_secs: i64, t: &RuleThresholds) -> Vec<Firing> {
    if flight.on_ground {
        return Vec::new();
    }

    let mut fired = Vec::new();

    if let Some(squawk) = &flight.squawk {
        if t.emergency_squawks.iter().any(|code| code == squawk) {
            let flight_level = flight.altitude_ft.unwrap_or(0) / 100;
            fired.push(Firing {
                rule: AlertRule::EmergencySquawk,
                severity: Severity::Critical,
                title: format!("Emergency Squawk {squawk}"),
                message: format!(
                    "{}: {}. Squawk {} detected at FL{}.",
                    flight.label(),
                    squawk_label(squawk),
                    squawk,
                    flight_level
                ),
            });
        }
    }

    if flight.vertical_rate_ftmin < t.rapid_descent_ftmin {
        fired.push(Firing {
            rule: AlertRule::RapidDescent,
            severity: Severity::Critical,
            title: "Rapid Descent Detected".to_string(),
            message: format!(
                "{} descending at {} ft/min. Alt: {} ft. Pos: {}",
                flight.label(),
                flight.vertical_rate_ftmin.abs(),
                flight.altitude_ft.unwrap_or(0),
                position_text(flight)
            ),
        });
    }

    if let Some(altitude) = flight.altitude_ft {
        if altitude > 0
            && altitude < t.ground_proximity_ft
            && flight.vertical_rate_ftmin < t.ground_proximity_descent_ftmin
        {
            fired.push(Firing {
                rule: AlertRule::GroundProximity,
                severity: Severity::Critical,
                title: "Ground Proximity Warning".to_string(),
                message: format!(
                    "{} at {} ft, descending {} ft/min. Pull-up advisory. Pos: {}",
                    flight.label(),
                    altitude,
                    flight.vertical_rate_ftmin.abs(),
                    position_text(flight)
                ),
            });
        } else if altitude > 0 && altitude < t.low_altitude_ft {
            fired.push(Firing {
                rule: AlertRule::LowAltitude,
                severity: Severity::Warning,
                title: "Low Altitude".to_string(),
                message: format!(
                    "{} flying at {} ft, below the {} ft floor. Pos: {}",
                    flight.label(),
                    altitude,
                    t.low_altitude_ft,
                    position_text(flight)
                ),
            });
        }
    }

    if let Some(speed) = flight.ground_speed_kt {
        if speed > t.excessive_speed_kt {
            fired.push(Firing {
                rule: AlertRule::ExcessiveSpeed,
                severity: Severity::Warning,
                title: "Excessive Speed".to_string(),
                message: format!(
                    "{} at {} kt, above the {} kt ceiling. Alt: {} ft",
                    flight.label(),
                    speed,
                    t.excessive_speed_kt,
                    flight.altitude_ft.unwrap_or(0)
                ),
            });
        }
    }

    if let Some(last_contact) = flight.last_contact {
        let stale_secs = now_secs - last_contact;
        if stale_secs > t.signal_lost_secs {
            fired.push(Firing {
                rule: AlertRule::SignalLost,
                severity: Severity::Warning,
                title: "Signal Lost".to_string(),
                message: format!(
                    "{}: no contact for {} s. Last seen at {} ft, pos {}",
                    flight.label(),
                    stale_secs,
                    flight.altitude_ft.unwrap_or(0),
                    position_text(flight)
                ),
            });
        }
    }

    fired
}
