//! Canonical Flight Snapshot

use serde::{Deserialize, Serialize};

/// One aircraft's instantaneous state, produced once per poll cycle.
///
/// Snapshots are immutable after normalization and replaced wholesale on
/// the next cycle; no per-field history is kept beyond the previous batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    /// Stable transponder address identifying the aircraft.
    pub icao24: String,
    /// Trimmed callsign, when broadcast.
    pub callsign: Option<String>,
    /// Country of registration, `"Unknown"` when the feed omits it.
    pub origin_country: String,
    /// Unix timestamp of the last position report, seconds.
    pub time_position: Option<i64>,
    /// Unix timestamp of the last message received, seconds.
    pub last_contact: Option<i64>,
    /// WGS-84 latitude, degrees.
    pub latitude: f64,
    /// WGS-84 longitude, degrees.
    pub longitude: f64,
    /// Barometric altitude, feet.
    pub altitude_ft: Option<i32>,
    /// Whether the aircraft reports surface contact.
    pub on_ground: bool,
    /// Ground speed, knots.
    pub ground_speed_kt: Option<i32>,
    /// True track, degrees clockwise from north.
    pub heading_deg: i32,
    /// Vertical rate, feet per minute; positive climbs.
    pub vertical_rate_ftmin: i32,
    /// Geometric altitude, feet.
    pub geo_altitude_ft: Option<i32>,
    /// Transponder squawk code.
    pub squawk: Option<String>,
    /// Special-purpose indicator flag.
    pub spi: bool,
    /// Emitter category reported by the transponder.
    pub category: Option<u8>,
}

impl Flight {
    /// Display label: callsign when present, transponder address otherwise.
    pub fn label(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.icao24)
    }
}
