//! Flight Safety Monitor - Main Entry Point

use monitor::{init_logging, run, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let settings = Settings::load()?;
    info!("=== Skywatch Flight Safety Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    run(settings).await
}
