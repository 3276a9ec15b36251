//! State-Vector Feed Client
//!
//! [`StateVectorFeed`] abstracts the upstream feed so the poller can run
//! against a scripted feed in tests. [`OpenSkyClient`] queries the OpenSky
//! `states/all` endpoint with a pooled `reqwest` client; one unauthenticated
//! GET per poll cycle, bounded by the configured timeout.

use std::future::Future;

use flight_data::{decode_batch, Flight, StatesPayload};
use tracing::debug;

use crate::config::{BoundingBox, SourceConfig};
use crate::error::FeedError;

/// A feed of aircraft state vectors for a geographic box.
pub trait StateVectorFeed: Send + Sync {
    /// Fetch all state vectors inside `bounds`, normalized into flights.
    fn fetch_states(
        &self,
        bounds: &BoundingBox,
    ) -> impl Future<Output = Result<Vec<Flight>, FeedError>> + Send;
}

/// OpenSky Network client.
pub struct OpenSkyClient {
    /// Reusable HTTP client with connection pooling.
    http: reqwest::Client,
    base_url: String,
}

impl OpenSkyClient {
    /// Build a client from the source configuration.
    pub fn new(config: &SourceConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| FeedError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn states_url(&self, bounds: &BoundingBox) -> String {
        format!(
            "{}/states/all?lamin={}&lamax={}&lomin={}&lomax={}",
            self.base_url, bounds.south, bounds.north, bounds.west, bounds.east
        )
    }
}

impl StateVectorFeed for OpenSkyClient {
    async fn fetch_states(&self, bounds: &BoundingBox) -> Result<Vec<Flight>, FeedError> {
        let response = self.http.get(self.states_url(bounds)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        let payload: StatesPayload = response.json().await?;

        let flights = decode_batch(&payload);
        debug!(count = flights.len(), "state vectors fetched");
        Ok(flights)
    }
}
