//! State-Vector Source
//!
//! Polls a live aircraft-state feed on a fixed cadence, normalizes each
//! batch into flight snapshots, and broadcasts per-cycle updates. Repeated
//! fetch failures trip a circuit breaker that halts polling until it is
//! explicitly restarted.

mod client;
mod config;
mod error;
mod poller;

pub use client::{OpenSkyClient, StateVectorFeed};
pub use config::{BoundingBox, SourceConfig};
pub use error::{FeedError, FeedFailure};
pub use poller::{PollUpdate, StateVectorSource};
