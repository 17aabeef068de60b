//! Gain from the window low.

use shared::CandleSeries;

/// `last_close / min(low over the last n candles) - 1`. `None` when the
/// series is shorter than `n` candles or the window low is not a
/// positive finite price.
pub fn gain_from_low(series: &CandleSeries, n: usize) -> Option<f64> {
    if n == 0 || series.len() < n {
        return None;
    }

    let candles = series.candles();
    let window = &candles[candles.len() - n..];
    let min_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    if !(min_low.is_finite() && min_low > 0.0) {
        return None;
    }

    let close = series.last()?.close;
    Some(close / min_low - 1.0)
}
