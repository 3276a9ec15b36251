//! Flight Data Types and Normalization
//!
//! Provides the canonical flight snapshot produced once per poll cycle and
//! the decoding of raw state-vector records into it.

mod flight;
mod state_vector;
mod units;

pub use flight::Flight;
pub use state_vector::{decode_batch, decode_state, StatesPayload};
pub use units::{meters_to_feet, mps_to_fpm, mps_to_knots};
