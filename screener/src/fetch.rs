//! Concurrent fan-out of per-asset candle fetches.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use shared::{AssetConfig, CandleSeries};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::exchange::ClientRegistry;

pub struct FetchOrchestrator {
    registry: Arc<ClientRegistry>,
    /// Bounds concurrent venue requests; venue rate limits, not local
    /// resources, are the scarce thing here.
    limiter: Arc<Semaphore>,
}

impl FetchOrchestrator {
    pub fn new(registry: Arc<ClientRegistry>, max_in_flight: usize) -> Self {
        Self {
            registry,
            limiter: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Fetch candles for every asset concurrently. A failed asset is
    /// logged and left out of the result; it never aborts the others.
    pub async fn fetch_all(
        &self,
        assets: &[AssetConfig],
        count: usize,
    ) -> HashMap<String, CandleSeries> {
        let tasks = assets.iter().map(|asset| {
            let asset = asset.clone();
            let registry = Arc::clone(&self.registry);
            let limiter = Arc::clone(&self.limiter);
            async move {
                let client = match registry.get(asset.exchange) {
                    Some(client) => client,
                    None => {
                        warn!(
                            asset = %asset.name,
                            exchange = %asset.exchange,
                            "no client for exchange, skipping"
                        );
                        return (asset.name, None);
                    }
                };

                // Permit held for the whole request.
                let _permit = match limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return (asset.name, None),
                };
                match client
                    .fetch_candles(&asset.symbol, asset.interval_minutes, count)
                    .await
                {
                    Ok(series) => (asset.name, Some(series)),
                    Err(err) => {
                        warn!(
                            asset = %asset.name,
                            exchange = %asset.exchange,
                            error = %err,
                            "fetch failed"
                        );
                        (asset.name, None)
                    }
                }
            }
        });

        let mut fetched = HashMap::new();
        for (name, series) in join_all(tasks).await {
            if let Some(series) = series {
                fetched.insert(name, series);
            }
        }
        fetched
    }
}
