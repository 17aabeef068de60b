//! Bybit v5 spot kline client.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use shared::{Candle, CandleSeries, ExchangeError};

use super::{get_with_retry, parse_price, ExchangeClient};

const KLINE_URL: &str = "https://api.bybit.com/v5/market/kline";

fn interval_tag(minutes: u32) -> Option<&'static str> {
    match minutes {
        5 => Some("5"),
        15 => Some("15"),
        60 => Some("60"),
        240 => Some("240"),
        1440 => Some("D"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KlineResponse {
    ret_code: i64,
    ret_msg: String,
    result: Option<KlineResult>,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<Vec<String>>,
}

pub struct BybitClient {
    http: Client,
}

impl BybitClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ExchangeClient for BybitClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        let tag = interval_tag(interval_minutes)
            .ok_or(ExchangeError::UnsupportedInterval(interval_minutes))?;

        // Bybit wants an explicit window; span exactly `count` intervals
        // back from now.
        let end = Utc::now().timestamp_millis();
        let start = end - i64::from(interval_minutes) * count as i64 * 60_000;
        let url = format!(
            "{KLINE_URL}?category=spot&symbol={}&interval={tag}&limit={count}&start={start}&end={end}",
            symbol.to_uppercase()
        );

        let response = get_with_retry(&self.http, &url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status));
        }

        let body: KlineResponse = response.json().await?;
        if body.ret_code != 0 {
            return Err(ExchangeError::Api {
                code: body.ret_code.to_string(),
                message: body.ret_msg,
            });
        }
        let rows = body
            .result
            .ok_or_else(|| ExchangeError::Parse("missing result".to_string()))?
            .list;
        parse_rows(&rows)
    }
}

/// Rows are `[startTimeMs, open, high, low, close, volume, turnover]`
/// as strings, newest first.
fn parse_rows(rows: &[Vec<String>]) -> Result<CandleSeries, ExchangeError> {
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
            .parse::<i64>()
            .map_err(|_| ExchangeError::Parse(format!("bad start time: {:?}", row[0])))?
            / 1000;
        candles.push(Candle::new(
            timestamp,
            parse_price(&row[1], "open")?,
            parse_price(&row[2], "high")?,
            parse_price(&row[3], "low")?,
            parse_price(&row[4], "close")?,
        ));
    }
    Ok(CandleSeries::from_wire(candles))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts_ms: i64, o: &str, h: &str, l: &str, c: &str) -> Vec<String> {
        vec![
            ts_ms.to_string(),
            o.to_string(),
            h.to_string(),
            l.to_string(),
            c.to_string(),
            "12.5".to_string(),
            "600000".to_string(),
        ]
    }

    #[test]
    fn newest_first_payload_comes_back_ascending() {
        let rows = vec![
            row(1700000864000, "105", "120", "104", "118"),
            row(1700000000000, "100", "110", "95", "105"),
        ];

        let series = parse_rows(&rows).unwrap();
        let stamps: Vec<i64> = series.candles().iter().map(|c| c.timestamp).collect();
        assert_eq!(stamps, vec![1700000000, 1700000864]);
        assert_eq!(series.candles()[0].close, 105.0);
    }

    #[test]
    fn error_envelope_is_reported() {
        let raw = r#"{"retCode":10001,"retMsg":"params error","result":{"list":[]}}"#;
        let body: KlineResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.ret_code, 10001);
        assert_eq!(body.ret_msg, "params error");
    }

    #[test]
    fn interval_vocabulary() {
        assert_eq!(interval_tag(240), Some("240"));
        assert_eq!(interval_tag(1440), Some("D"));
        assert_eq!(interval_tag(3), None);
    }
}
