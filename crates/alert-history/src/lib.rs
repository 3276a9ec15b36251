//! Alert History Buffer
//!
//! Provides a fixed-capacity, newest-first buffer for alert records.

mod buffer;

pub use buffer::{HistoryBuffer, DEFAULT_CAPACITY};
