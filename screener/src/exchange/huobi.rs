//! Huobi kline client. The one venue serving candles as json objects
//! with second-resolution timestamps.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::{Candle, CandleSeries, ExchangeError};

use super::{get_with_retry, ExchangeClient};

const KLINE_URL: &str = "https://api.huobi.pro/market/history/kline";

fn period_tag(minutes: u32) -> Option<&'static str> {
    match minutes {
        5 => Some("5min"),
        15 => Some("15min"),
        60 => Some("60min"),
        240 => Some("4hour"),
        1440 => Some("1day"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    status: String,
    #[serde(rename = "err-code", default)]
    err_code: Option<String>,
    #[serde(rename = "err-msg", default)]
    err_msg: Option<String>,
    #[serde(default)]
    data: Vec<KlineEntry>,
}

/// `id` is the candle open time in unix seconds.
#[derive(Debug, Deserialize)]
struct KlineEntry {
    id: i64,
    open: f64,
    close: f64,
    low: f64,
    high: f64,
}

pub struct HuobiClient {
    http: Client,
}

impl HuobiClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ExchangeClient for HuobiClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        let period = period_tag(interval_minutes)
            .ok_or(ExchangeError::UnsupportedInterval(interval_minutes))?;
        let url = format!(
            "{KLINE_URL}?symbol={}&period={period}&size={count}",
            symbol.to_lowercase()
        );

        let response = get_with_retry(&self.http, &url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status));
        }

        let body: KlineResponse = response.json().await?;
        parse_response(body)
    }
}

fn parse_response(body: KlineResponse) -> Result<CandleSeries, ExchangeError> {
    if body.status != "ok" {
        return Err(ExchangeError::Api {
            code: body.err_code.unwrap_or_else(|| "unknown".to_string()),
            message: body.err_msg.unwrap_or_default(),
        });
    }
    if body.data.is_empty() {
        return Err(ExchangeError::Parse("empty kline payload".to_string()));
    }

    // Newest first on the wire.
    let candles = body
        .data
        .into_iter()
        .map(|entry| Candle::new(entry.id, entry.open, entry.high, entry.low, entry.close))
        .collect();
    Ok(CandleSeries::from_wire(candles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_object_payload_ascending() {
        let raw = r#"{
            "status": "ok",
            "ch": "market.btcusdt.kline.4hour",
            "ts": 1700001000000,
            "data": [
                {"id": 1700000864, "open": 105.0, "close": 118.0, "low": 104.0, "high": 120.0, "amount": 1.0, "vol": 2.0, "count": 3},
                {"id": 1700000000, "open": 100.0, "close": 105.0, "low": 95.0, "high": 110.0, "amount": 1.0, "vol": 2.0, "count": 3}
            ]
        }"#;
        let body: KlineResponse = serde_json::from_str(raw).unwrap();

        let series = parse_response(body).unwrap();
        let stamps: Vec<i64> = series.candles().iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![1700000000, 1700000864]);
        assert_eq!(series.candles()[1].high, 120.0);
    }

    #[test]
    fn venue_error_becomes_api_error() {
        let raw = r#"{"status":"error","err-code":"invalid-parameter","err-msg":"invalid symbol","data":[]}"#;
        let body: KlineResponse = serde_json::from_str(raw).unwrap();

        match parse_response(body) {
            Err(ExchangeError::Api { code, message }) => {
                assert_eq!(code, "invalid-parameter");
                assert_eq!(message, "invalid symbol");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn period_vocabulary() {
        assert_eq!(period_tag(240), Some("4hour"));
        assert_eq!(period_tag(60), Some("60min"));
        assert_eq!(period_tag(2), None);
    }
}
