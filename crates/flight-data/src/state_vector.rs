//! State-Vector Decoding
//!
//! The feed delivers each aircraft as a fixed-position JSON array of mixed
//! types. Columns are indexed rather than named, so records decode through
//! `serde_json::Value` lookups; serde tuples cap at sixteen elements and the
//! rows carry eighteen.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::flight::Flight;
use crate::units::{meters_to_feet, mps_to_fpm, mps_to_knots};

// Column order of one state-vector row.
const COL_ICAO24: usize = 0;
const COL_CALLSIGN: usize = 1;
const COL_ORIGIN_COUNTRY: usize = 2;
const COL_TIME_POSITION: usize = 3;
const COL_LAST_CONTACT: usize = 4;
const COL_LONGITUDE: usize = 5;
const COL_LATITUDE: usize = 6;
const COL_BARO_ALTITUDE_M: usize = 7;
const COL_ON_GROUND: usize = 8;
const COL_VELOCITY_MPS: usize = 9;
const COL_TRUE_TRACK_DEG: usize = 10;
const COL_VERTICAL_RATE_MPS: usize = 11;
const COL_GEO_ALTITUDE_M: usize = 13;
const COL_SQUAWK: usize = 14;
const COL_SPI: usize = 15;
const COL_CATEGORY: usize = 17;

/// Raw feed payload: a fetch timestamp plus zero or more state-vector rows.
///
/// A missing `states` field decodes as an empty batch; the upstream feed
/// sends `null` when no aircraft are in the requested box.
#[derive(Debug, Deserialize)]
pub struct StatesPayload {
    pub time: Option<i64>,
    #[serde(default)]
    pub states: Option<Vec<Vec<Value>>>,
}

fn str_at(row: &[Value], idx: usize) -> Option<&str> {
    row.get(idx).and_then(Value::as_str)
}

/// Numeric column, rejecting NaN and infinities from the feed.
fn f64_at(row: &[Value], idx: usize) -> Option<f64> {
    row.get(idx).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn i64_at(row: &[Value], idx: usize) -> Option<i64> {
    row.get(idx).and_then(Value::as_i64)
}

fn bool_at(row: &[Value], idx: usize) -> bool {
    row.get(idx).and_then(Value::as_bool).unwrap_or(false)
}

/// Decode one state-vector row into a normalized [`Flight`].
///
/// Returns `None` for records lacking a usable position or transponder
/// address; those are dropped from the batch. Metric fields convert to
/// aviation units here, once, so downstream rule evaluation never touches
/// raw feed values.
pub fn decode_state(row: &[Value]) -> Option<Flight> {
    let icao24 = str_at(row, COL_ICAO24)?.to_string();
    let longitude = f64_at(row, COL_LONGITUDE)?;
    let latitude = f64_at(row, COL_LATITUDE)?;

    let callsign = str_at(row, COL_CALLSIGN)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let origin_country = str_at(row, COL_ORIGIN_COUNTRY)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
        .to_string();

    Some(Flight {
        icao24,
        callsign,
        origin_country,
        time_position: i64_at(row, COL_TIME_POSITION),
        last_contact: i64_at(row, COL_LAST_CONTACT),
        latitude,
        longitude,
        altitude_ft: f64_at(row, COL_BARO_ALTITUDE_M).map(meters_to_feet),
        on_ground: bool_at(row, COL_ON_GROUND),
        ground_speed_kt: f64_at(row, COL_VELOCITY_MPS).map(mps_to_knots),
        heading_deg: f64_at(row, COL_TRUE_TRACK_DEG)
            .map(|deg| deg.round() as i32)
            .unwrap_or(0),
        vertical_rate_ftmin: f64_at(row, COL_VERTICAL_RATE_MPS)
            .map(mps_to_fpm)
            .unwrap_or(0),
        geo_altitude_ft: f64_at(row, COL_GEO_ALTITUDE_M).map(meters_to_feet),
        squawk: str_at(row, COL_SQUAWK)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        spi: bool_at(row, COL_SPI),
        category: i64_at(row, COL_CATEGORY).and_then(|c| u8::try_from(c).ok()),
    })
}

/// Decode a whole payload, dropping unusable records.
pub fn decode_batch(payload: &StatesPayload) -> Vec<Flight> {
    let rows = match &payload.states {
        Some(rows) => rows.as_slice(),
        None => return Vec::new(),
    };

    let flights: Vec<Flight> = rows.iter().filter_map(|row| decode_state(row)).collect();
    let dropped = rows.len() - flights.len();
    if dropped > 0 {
        debug!(dropped, "state vectors without position discarded");
    }
    flights
}
