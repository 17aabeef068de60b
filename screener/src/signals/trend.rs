//! EMA-ratio trend strength.

use shared::CandleSeries;
use ta::indicators::ExponentialMovingAverage;
use ta::Next;

const SPANS: [usize; 3] = [12, 21, 50];

/// Mean of EMA12/EMA21 and EMA21/EMA50 over closes, minus one. Positive
/// when faster averages ride above slower ones. The newest candle is
/// dropped first when it is still forming at `now`, so a half-built
/// candle never skews the fast EMA.
pub fn trend_strength(series: &CandleSeries, interval_minutes: u32, now: i64) -> Option<f64> {
    let mut closes = series.closes();
    if let Some(last) = series.last() {
        if now - last.timestamp < i64::from(interval_minutes) * 60 {
            closes.pop();
        }
    }
    if closes.is_empty() {
        return None;
    }

    let mut emas = [0.0f64; 3];
    for (slot, &span) in emas.iter_mut().zip(SPANS.iter()) {
        *slot = ema_last(&closes, span)?;
    }

    let ratios = [emas[0] / emas[1], emas[1] / emas[2]];
    Some(ratios.iter().sum::<f64>() / ratios.len() as f64 - 1.0)
}

/// Final value of the seeded EMA recurrence over `values`.
fn ema_last(values: &[f64], span: usize) -> Option<f64> {
    let mut ema = ExponentialMovingAverage::new(span).ok()?;
    let mut last = None;
    for &value in values {
        last = Some(ema.next(value));
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Candle;

    const INTERVAL: u32 = 240;
    const INTERVAL_SECS: i64 = 240 * 60;

    fn series_of_closes(closes: &[f64]) -> CandleSeries {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * INTERVAL_SECS, c, c + 1.0, c - 1.0, c))
            .collect();
        CandleSeries::from_wire(candles)
    }

    /// A `now` far past the last candle, so nothing counts as forming.
    fn settled_now(series: &CandleSeries) -> i64 {
        series.last().map(|c| c.timestamp).unwrap_or(0) + 10 * INTERVAL_SECS
    }

    #[test]
    fn flat_series_scores_exactly_zero() {
        let series = series_of_closes(&[100.0; 60]);
        let strength = trend_strength(&series, INTERVAL, settled_now(&series));
        assert_eq!(strength, Some(0.0));
    }

    #[test]
    fn rising_series_scores_positive() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let series = series_of_closes(&closes);
        let strength = trend_strength(&series, INTERVAL, settled_now(&series)).unwrap();
        assert!(strength > 0.0, "strength = {strength}");
    }

    #[test]
    fn falling_series_scores_negative() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let series = series_of_closes(&closes);
        let strength = trend_strength(&series, INTERVAL, settled_now(&series)).unwrap();
        assert!(strength < 0.0, "strength = {strength}");
    }

    #[test]
    fn forming_candle_is_ignored() {
        // Identical history; one copy has an extra in-progress candle
        // with a wild close. Strength must not move.
        let mut closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let settled = series_of_closes(&closes);
        let now = settled.last().unwrap().timestamp + INTERVAL_SECS;

        closes.push(500.0);
        let with_forming = series_of_closes(&closes);
        // The forming candle opened at `now - a bit`, so it is excluded.
        let now = now + INTERVAL_SECS / 2;

        assert_eq!(
            trend_strength(&settled, INTERVAL, now),
            trend_strength(&with_forming, INTERVAL, now)
        );
    }

    #[test]
    fn single_forming_candle_is_unavailable() {
        let series = series_of_closes(&[100.0]);
        let now = series.last().unwrap().timestamp + 1;
        assert_eq!(trend_strength(&series, INTERVAL, now), None);
    }
}
