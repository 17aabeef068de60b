//! Binance spot client with a one-shot USD-M futures fallback for
//! symbols that only trade as perpetuals.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{Candle, CandleSeries, ExchangeError};
use tracing::debug;

use super::{get_with_retry, ExchangeClient};

const SPOT_URL: &str = "https://api.binance.com/api/v3/klines";
const FUTURES_URL: &str = "https://fapi.binance.com/fapi/v1/klines";

fn interval_tag(minutes: u32) -> Option<&'static str> {
    match minutes {
        5 => Some("5m"),
        15 => Some("15m"),
        60 => Some("1h"),
        240 => Some("4h"),
        1440 => Some("1d"),
        _ => None,
    }
}

pub struct BinanceClient {
    http: Client,
    spot_url: String,
    futures_url: String,
}

impl BinanceClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            spot_url: SPOT_URL.to_string(),
            futures_url: FUTURES_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_urls(http: Client, spot_url: String, futures_url: String) -> Self {
        Self {
            http,
            spot_url,
            futures_url,
        }
    }

    async fn fetch_from(
        &self,
        base: &str,
        symbol: &str,
        tag: &str,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        let url = format!(
            "{base}?symbol={}&interval={tag}&limit={count}",
            symbol.to_uppercase()
        );
        let response = get_with_retry(&self.http, &url).await?;
        let status = response.status();
        if !status.is_success() {
            // Symbol problems come back as a small {code, msg} envelope.
            if let Ok(body) = response.json::<Value>().await {
                if let (Some(code), Some(message)) = (body["code"].as_i64(), body["msg"].as_str())
                {
                    return Err(ExchangeError::Api {
                        code: code.to_string(),
                        message: message.to_string(),
                    });
                }
            }
            return Err(ExchangeError::Status(status));
        }

        let rows: Vec<Vec<Value>> = response.json().await?;
        parse_klines(&rows)
    }
}

#[async_trait]
impl ExchangeClient for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        let tag = interval_tag(interval_minutes)
            .ok_or(ExchangeError::UnsupportedInterval(interval_minutes))?;

        match self.fetch_from(&self.spot_url, symbol, tag, count).await {
            Ok(series) => Ok(series),
            // A parse failure of a successful spot response would repeat
            // on the futures endpoint, so only venue rejections and
            // transport errors fall through.
            Err(err) if err.is_transport() => {
                debug!(symbol, error = %err, "spot fetch failed, trying usd-m futures");
                self.fetch_from(&self.futures_url, symbol, tag, count).await
            }
            Err(err) => Err(err),
        }
    }
}

/// Parse the array-of-arrays kline payload. Open time is in
/// milliseconds at index 0, OHLC are strings at indices 1..=4.
fn parse_klines(rows: &[Vec<Value>]) -> Result<CandleSeries, ExchangeError> {
    if rows.is_empty() {
        return Err(ExchangeError::Parse("empty kline payload".to_string()));
    }

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() < 5 {
            return Err(ExchangeError::Parse(format!(
                "kline row has {} fields, expected at least 5",
                row.len()
            )));
        }
        let timestamp = row[0]
            .as_i64()
            .ok_or_else(|| ExchangeError::Parse("open time is not an integer".to_string()))?
            / 1000;
        candles.push(Candle::new(
            timestamp,
            json_price(&row[1], "open")?,
            json_price(&row[2], "high")?,
            json_price(&row[3], "low")?,
            json_price(&row[4], "close")?,
        ));
    }
    Ok(CandleSeries::from_wire(candles))
}

fn json_price(value: &Value, what: &str) -> Result<f64, ExchangeError> {
    match value {
        Value::String(raw) => super::parse_price(raw, what),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExchangeError::Parse(format!("bad {what}: {n}"))),
        other => Err(ExchangeError::Parse(format!("bad {what}: {other}"))),
    }
}
