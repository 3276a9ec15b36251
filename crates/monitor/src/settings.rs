//! Runtime Settings
//!
//! Layered configuration: an optional `skywatch.toml` next to the binary,
//! overridden by `SKYWATCH_*` environment variables.

use alert_engine::EngineConfig;
use serde::Deserialize;
use state_source::SourceConfig;

/// Top-level settings for the monitor daemon.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceConfig,
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings from `skywatch.toml` (optional) plus environment
    /// overrides, e.g. `SKYWATCH_SOURCE__POLL_INTERVAL_MS=5000`.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("skywatch").required(false))
            .add_source(
                config::Environment::with_prefix("SKYWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
