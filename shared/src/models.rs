//! Core data model shared by the screener engine and the binaries.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Supported candle venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
    Bybit,
    Huobi,
    Kucoin,
}

impl Exchange {
    /// Parse the lowercase venue name used in the assets file.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "binance" => Some(Exchange::Binance),
            "bybit" => Some(Exchange::Bybit),
            "huobi" => Some(Exchange::Huobi),
            "kucoin" => Some(Exchange::Kucoin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Binance => "binance",
            Exchange::Bybit => "bybit",
            Exchange::Huobi => "huobi",
            Exchange::Kucoin => "kucoin",
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the assets file: which pair to fetch from where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Display name, unique across the file (e.g. "BTC").
    pub name: String,
    /// Venue trading-pair id (e.g. "BTCUSDT", "btcusdt", "BTC-USDT").
    pub symbol: String,
    pub exchange: Exchange,
    /// Display grouping for the dashboard, opaque here.
    pub tier: u8,
    /// Dashboard watchlist flag, opaque here.
    pub watchlist: bool,
    /// Candle interval; assets without one inherit the configured default.
    pub interval_minutes: u32,
}

/// One OHLC candle. Timestamp is the exchange-reported open time in
/// whole unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }
}

/// Candles ordered ascending by timestamp, unique per timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new() -> Self {
        Self {
            candles: Vec::new(),
        }
    }

    /// Build a series from wire-order candles. Several venues return
    /// newest first; this sorts ascending and drops duplicate timestamps
    /// so the ordering invariant holds regardless of the source.
    pub fn from_wire(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Self { candles }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Close prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Low prices, oldest first.
    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    /// Keep only the most recent `n` candles.
    pub fn truncate_to_last(&mut self, n: usize) {
        if self.candles.len() > n {
            let cut = self.candles.len() - n;
            self.candles.drain(..cut);
        }
    }
}

/// Named gain window, counted in candles (e.g. "1w" = 42 four-hour candles).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    pub label: String,
    pub candles: usize,
}

impl Lookback {
    pub fn new(label: impl Into<String>, candles: usize) -> Self {
        Self {
            label: label.into(),
            candles,
        }
    }
}

/// Derived signals for one asset. `None` always means the metric could
/// not be computed from the available history, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    /// Gain-from-low per lookback label.
    pub gains: BTreeMap<String, Option<f64>>,
    pub trend_strength: Option<f64>,
    /// `Some(0.0)` is an explicit "no pump detected".
    pub pump_strength: Option<f64>,
}

/// Metrics plus the config passthrough the dashboard filters on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub name: String,
    pub symbol: String,
    pub exchange: Exchange,
    pub tier: u8,
    pub watchlist: bool,
    pub metrics: AssetMetrics,
}

/// Output of one completed cycle. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Cycle completion time, unix seconds. Doubles as the snapshot id.
    pub timestamp: i64,
    pub rows: Vec<SnapshotRow>,
}
