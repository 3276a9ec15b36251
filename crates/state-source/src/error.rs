//! Feed Error Types

use serde::Serialize;
use thiserror::Error;

/// Errors from one poll cycle against the state-vector feed.
///
/// Every variant counts as one consecutive failure toward the circuit
/// breaker; a malformed payload is treated no differently from a transport
/// failure.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure, including request timeout.
    #[error("transport error: {0}")]
    Http(String),

    /// Non-success HTTP status from the feed.
    #[error("feed returned HTTP status {0}")]
    Status(u16),

    /// Unexpected payload shape.
    #[error("malformed feed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Malformed(err.to_string())
        } else {
            FeedError::Http(err.to_string())
        }
    }
}

/// Failure notice delivered to subscribers when the breaker trips.
///
/// Accompanies the last known-good batch so consumers can keep showing
/// stale data, explicitly flagged.
#[derive(Debug, Clone, Serialize)]
pub struct FeedFailure {
    /// Description of the final failed fetch.
    pub message: String,
}
