//! Venue clients behind a common trait, plus the registry that maps
//! configured exchanges to them.

mod binance;
mod bybit;
mod huobi;
mod kucoin;

pub use binance::BinanceClient;
pub use bybit::BybitClient;
pub use huobi::HuobiClient;
pub use kucoin::KucoinClient;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{AssetConfig, CandleSeries, ConfigError, Exchange, ExchangeError};
use tracing::warn;

/// Pause before the single retry after a 429.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(500);

/// A source of recent candles for one venue.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Fetch up to `count` most recent candles for `symbol`, returned
    /// ascending by timestamp regardless of the venue's wire order.
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError>;
}

/// Maps each configured exchange to its client. Adding a venue is one
/// `ExchangeClient` impl plus one `register` call.
pub struct ClientRegistry {
    clients: HashMap<Exchange, Arc<dyn ExchangeClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// All four built-in venues sharing one HTTP client.
    pub fn builtin(http: Client) -> Self {
        let mut registry = Self::new();
        registry.register(
            Exchange::Binance,
            Arc::new(BinanceClient::new(http.clone())),
        );
        registry.register(Exchange::Bybit, Arc::new(BybitClient::new(http.clone())));
        registry.register(Exchange::Huobi, Arc::new(HuobiClient::new(http.clone())));
        registry.register(Exchange::Kucoin, Arc::new(KucoinClient::new(http)));
        registry
    }

    pub fn register(&mut self, exchange: Exchange, client: Arc<dyn ExchangeClient>) {
        self.clients.insert(exchange, client);
    }

    pub fn get(&self, exchange: Exchange) -> Option<Arc<dyn ExchangeClient>> {
        self.clients.get(&exchange).cloned()
    }

    /// Startup check: every venue referenced by the assets file must
    /// have a client registered.
    pub fn ensure_supported(&self, assets: &[AssetConfig]) -> Result<(), ConfigError> {
        for asset in assets {
            if !self.clients.contains_key(&asset.exchange) {
                return Err(ConfigError::MissingClient(asset.exchange));
            }
        }
        Ok(())
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the HTTP client shared by all venue clients. The timeout set
/// here bounds every individual fetch.
pub fn http_client(timeout_secs: u64) -> Result<Client, ExchangeError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// GET with a single retry after a short pause when the venue answers
/// 429. A second 429 gives up with `RateLimited`.
pub(crate) async fn get_with_retry(http: &Client, url: &str) -> Result<Response, ExchangeError> {
    let response = http.get(url).send().await?;
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return Ok(response);
    }

    warn!(%url, "rate limited, retrying once");
    tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
    let response = http.get(url).send().await?;
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(ExchangeError::RateLimited);
    }
    Ok(response)
}

/// Parse a numeric string field from a venue payload.
pub(crate) fn parse_price(raw: &str, what: &str) -> Result<f64, ExchangeError> {
    raw.parse()
        .map_err(|_| ExchangeError::Parse(format!("bad {what}: {raw:?}")))
}
