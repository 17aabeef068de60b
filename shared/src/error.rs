//! Error taxonomy: startup-fatal config errors vs per-asset fetch errors.

use thiserror::Error;

use crate::models::Exchange;

/// Problems with the environment or the assets file. Fatal at startup,
/// before any cycle runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: String, value: String },

    #[error("asset {asset:?}: unknown exchange {exchange:?}")]
    UnknownExchange { asset: String, exchange: String },

    #[error("malformed asset record: {0}")]
    MalformedAsset(String),

    #[error("no client registered for exchange {0}")]
    MissingClient(Exchange),

    #[error("asset file error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything that can go wrong fetching one asset's candles. Scoped to
/// that asset: the orchestrator logs it and moves on.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected http status {0}")]
    Status(reqwest::StatusCode),

    #[error("rate limited after retry")]
    RateLimited,

    #[error("api error {code}: {message}")]
    Api { code: String, message: String },

    #[error("no interval mapping for {0} minutes")]
    UnsupportedInterval(u32),

    #[error("bad payload: {0}")]
    Parse(String),
}

impl ExchangeError {
    /// Transport-level failure (as opposed to a malformed success),
    /// the class that makes trying an alternate endpoint worthwhile.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ExchangeError::Http(_)
                | ExchangeError::Status(_)
                | ExchangeError::RateLimited
                | ExchangeError::Api { .. }
        )
    }
}
