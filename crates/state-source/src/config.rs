//! Polling Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rectangular geographic filter for the state-vector query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude, degrees.
    pub south: f64,
    /// Maximum latitude, degrees.
    pub north: f64,
    /// Minimum longitude, degrees.
    pub west: f64,
    /// Maximum longitude, degrees.
    pub east: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        // Indian airspace, mainland plus islands.
        Self {
            south: 6.0,
            north: 37.0,
            west: 68.0,
            east: 98.0,
        }
    }
}

/// Polling parameters. Immutable once the source is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Geographic box the feed is queried for.
    pub bounds: BoundingBox,
    /// Poll cadence in milliseconds (default: 15000, the anonymous-access
    /// rate the upstream feed tolerates).
    pub poll_interval_ms: u64,
    /// Consecutive failures before the circuit breaker trips (default: 5).
    pub max_consecutive_errors: u32,
    /// Feed base URL.
    pub base_url: String,
    /// Transport timeout per request in milliseconds; expiry counts as a
    /// failed cycle (default: 10000).
    pub request_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::default(),
            poll_interval_ms: 15_000,
            max_consecutive_errors: 5,
            base_url: "https://opensky-network.org/api".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl SourceConfig {
    /// Poll cadence as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
