//! Spike-versus-baseline pump detector.

use shared::CandleSeries;

/// Newest candles treated as spike candidates.
const SPIKE_CANDLES: usize = 3;
/// Detection threshold in baseline standard deviations.
const SIGMA_FACTOR: f64 = 2.0;

/// Looks at candle bodies `|close - open|` over the trailing `window`
/// candles. The largest body among the newest three is a pump when it
/// exceeds the older bodies' mean by more than two standard deviations;
/// the reported strength is `spike / mean - 1`.
///
/// `Some(0.0)` is an explicit "checked, nothing spiking". `None` means
/// the series cannot support the comparison (fewer than four candles,
/// or a dead-flat baseline).
pub fn pump_strength(series: &CandleSeries, window: usize) -> Option<f64> {
    let candles = series.candles();
    let start = candles.len().saturating_sub(window);
    let tail = &candles[start..];
    if tail.len() < SPIKE_CANDLES + 1 {
        return None;
    }

    let bodies: Vec<f64> = tail.iter().map(|c| (c.close - c.open).abs()).collect();
    let (baseline, recent) = bodies.split_at(bodies.len() - SPIKE_CANDLES);

    let spike = recent.iter().copied().fold(0.0f64, f64::max);
    let mean = baseline.iter().sum::<f64>() / baseline.len() as f64;
    if mean <= 0.0 {
        return None;
    }
    let variance = baseline
        .iter()
        .map(|b| (b - mean).powi(2))
        .sum::<f64>()
        / baseline.len() as f64;
    let std_dev = variance.sqrt();

    if spike > mean + SIGMA_FACTOR * std_dev {
        Some(spike / mean - 1.0)
    } else {
        Some(0.0)
    }
}
