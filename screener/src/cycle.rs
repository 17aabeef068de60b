//! One screening cycle: load assets, fetch, compute, persist.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use shared::{load_assets, Config, Snapshot, SnapshotRow};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::exchange::ClientRegistry;
use crate::fetch::FetchOrchestrator;
use crate::signals::{compute_metrics, SignalConfig};
use crate::store::SnapshotStore;
use crate::Result;

/// Owns the pipeline and serializes cycle runs. Cheap to share behind
/// an `Arc`; both the scheduler and the API hold one.
pub struct Screener {
    config: Config,
    orchestrator: FetchOrchestrator,
    store: SnapshotStore,
    signals: SignalConfig,
    run_lock: Mutex<()>,
}

impl Screener {
    pub fn new(config: Config, registry: Arc<ClientRegistry>) -> Result<Self> {
        let store = SnapshotStore::new(&config.data_dir, config.snapshot_retain)?;
        let orchestrator = FetchOrchestrator::new(registry, config.fetch_max_in_flight);
        let signals = SignalConfig {
            lookbacks: config.lookbacks.clone(),
            ..SignalConfig::default()
        };
        Ok(Self {
            config,
            orchestrator,
            store,
            signals,
            run_lock: Mutex::new(()),
        })
    }

    /// Run one full cycle, waiting for any in-flight one to finish
    /// first. Returns the completion timestamp written to the snapshot.
    pub async fn run_cycle(&self) -> Result<i64> {
        let _guard = self.run_lock.lock().await;
        self.execute().await
    }

    /// Scheduler entry point: skip instead of queueing when a cycle is
    /// already running.
    pub async fn try_run_cycle(&self) -> Option<Result<i64>> {
        match self.run_lock.try_lock() {
            Ok(_guard) => Some(self.execute().await),
            Err(_) => None,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    async fn execute(&self) -> Result<i64> {
        let started = Instant::now();
        let assets = load_assets(&self.config.assets_file, self.config.kline_interval_minutes)
            .context("loading assets file")?;
        info!(assets = assets.len(), "cycle started");

        let fetched = self
            .orchestrator
            .fetch_all(&assets, self.config.kline_count)
            .await;
        let now = Utc::now().timestamp();

        let mut rows = Vec::with_capacity(fetched.len());
        for asset in &assets {
            let series = match fetched.get(&asset.name) {
                Some(series) => series,
                None => continue,
            };
            if self.config.write_klines {
                if let Err(err) = self.store.write_klines(&asset.name, series) {
                    warn!(asset = %asset.name, error = %err, "kline side file write failed");
                }
            }
            let metrics = compute_metrics(series, asset.interval_minutes, now, &self.signals);
            rows.push(SnapshotRow {
                name: asset.name.clone(),
                symbol: asset.symbol.clone(),
                exchange: asset.exchange,
                tier: asset.tier,
                watchlist: asset.watchlist,
                metrics,
            });
        }

        let snapshot = Snapshot {
            timestamp: now,
            rows,
        };
        self.store.write(&snapshot).context("writing snapshot")?;
        let pruned = self.store.prune().context("pruning snapshots")?;

        info!(
            ok = snapshot.rows.len(),
            failed = assets.len() - snapshot.rows.len(),
            pruned,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cycle finished"
        );
        Ok(snapshot.timestamp)
    }
}
