//! Long-running screener worker: validate config, run one cycle right
//! away, then follow the minute scheduler until the parent goes away.

use std::sync::Arc;

use anyhow::Result;
use screener::exchange::{self, ClientRegistry};
use screener::{CycleScheduler, LivenessProbe, NeverExit, ParentProbe, Screener};
use shared::{load_assets, Config};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("Starting screener worker...");

    let config = Config::from_env()?;

    // A broken assets file or an unsupported venue should kill the
    // process here, not fail every cycle at runtime.
    let assets = load_assets(&config.assets_file, config.kline_interval_minutes)?;
    let http = exchange::http_client(config.fetch_timeout_secs)?;
    let registry = Arc::new(ClientRegistry::builtin(http));
    registry.ensure_supported(&assets)?;
    info!(assets = assets.len(), "assets file validated");

    let probe: Box<dyn LivenessProbe> = if config.watch_parent {
        Box::new(ParentProbe::new())
    } else {
        Box::new(NeverExit)
    };
    let cadence = config.cycle_cadence_minutes;
    let screener = Arc::new(Screener::new(config, registry)?);

    // Populate a snapshot immediately instead of waiting for the first
    // matching minute.
    match screener.run_cycle().await {
        Ok(timestamp) => info!(timestamp, "startup cycle complete"),
        Err(err) => warn!(error = %err, "startup cycle failed"),
    }

    CycleScheduler::new(screener, cadence, probe).run().await;

    info!("Screener worker stopped");
    Ok(())
}
