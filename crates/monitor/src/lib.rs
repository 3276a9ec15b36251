//! Monitor Runtime
//!
//! Wires the state-vector source into the alert engine: one task forwards
//! successful poll cycles into analysis, one task logs alert lifecycle
//! events, and the main task waits for shutdown.

mod settings;

pub use settings::Settings;

use std::sync::Arc;

use alert_engine::{AlertEngine, AlertsChanged};
use state_source::{OpenSkyClient, StateVectorSource};
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize logging. `RUST_LOG` selects levels, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the monitoring pipeline until ctrl-c.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let client = OpenSkyClient::new(&settings.source)?;
    let source = StateVectorSource::new(client, settings.source.clone());
    let engine = Arc::new(RwLock::new(AlertEngine::new(settings.engine.clone())));

    let mut alert_events = engine.read().await.subscribe();
    tokio::spawn(async move {
        while let Ok(changed) = alert_events.recv().await {
            log_changes(&changed);
        }
    });

    let mut updates = source.subscribe();
    let analyzer = Arc::clone(&engine);
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    if let Some(failure) = &update.failure {
                        error!(
                            message = %failure.message,
                            stale_flights = update.flights.len(),
                            "feed halted after repeated failures; restart required"
                        );
                        continue;
                    }
                    analyzer.write().await.analyze(&update.flights);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "poll updates lagged, cycles skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    source.start();
    info!(
        bounds = ?settings.source.bounds,
        "monitoring started, press ctrl-c to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    source.stop();
    Ok(())
}

fn log_changes(changed: &AlertsChanged) {
    for alert in &changed.created {
        warn!(
            icao24 = %alert.icao24,
            severity = ?alert.severity,
            title = %alert.title,
            message = %alert.message,
            "alert raised"
        );
    }
    for alert in &changed.resolved {
        info!(icao24 = %alert.icao24, title = %alert.title, "alert resolved");
    }
}
