//! Derived per-asset signals. Everything here is a pure function of the
//! candle series and the clock value passed in.

pub mod gain;
pub mod pump;
pub mod trend;

use std::collections::BTreeMap;

use shared::{AssetMetrics, CandleSeries, Lookback};

/// Tunables for the signal pass.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub lookbacks: Vec<Lookback>,
    /// Trailing candles fed to the pump detector.
    pub pump_window: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            lookbacks: vec![
                Lookback::new("1d", 6),
                Lookback::new("3d", 18),
                Lookback::new("1w", 42),
            ],
            pump_window: 42,
        }
    }
}

/// Compute every metric for one asset. Identical inputs give identical
/// output; unavailable metrics come back as `None`, never zero.
pub fn compute_metrics(
    series: &CandleSeries,
    interval_minutes: u32,
    now: i64,
    config: &SignalConfig,
) -> AssetMetrics {
    let mut gains = BTreeMap::new();
    for lookback in &config.lookbacks {
        gains.insert(
            lookback.label.clone(),
            gain::gain_from_low(series, lookback.candles),
        );
    }

    AssetMetrics {
        gains,
        trend_strength: trend::trend_strength(series, interval_minutes, now),
        pump_strength: pump::pump_strength(series, config.pump_window),
    }
}
