//! KuCoin kline client. Careful: rows are time, open, close, high, low,
//! not the usual OHLC order.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::{Candle, CandleSeries, ExchangeError};

use super::{get_with_retry, parse_price, ExchangeClient};

const KLINE_URL: &str = "https://api.kucoin.com/api/v1/market/candles";
const OK_CODE: &str = "200000";

fn type_tag(minutes: u32) -> Option<&'static str> {
    match minutes {
        5 => Some("5min"),
        15 => Some("15min"),
        60 => Some("1hour"),
        240 => Some("4hour"),
        1440 => Some("1day"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Vec<Vec<String>>,
}

pub struct KucoinClient {
    http: Client,
}

impl KucoinClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ExchangeClient for KucoinClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        let tag = type_tag(interval_minutes)
            .ok_or(ExchangeError::UnsupportedInterval(interval_minutes))?;
        // No limit parameter; the venue sends its recent window and we
        // truncate to `count` below.
        let url = format!("{KLINE_URL}?symbol={symbol}&type={tag}");

        let response = get_with_retry(&self.http, &url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status));
        }

        let body: KlineResponse = response.json().await?;
        if body.code != OK_CODE {
            return Err(ExchangeError::Api {
                code: body.code,
                message: body.msg.unwrap_or_default(),
            });
        }

        let mut series = parse_rows(&body.data)?;
        series.truncate_to_last(count);
        Ok(series)
    }
}

/// Rows are `[time-secs, open, close, high, low, volume, turnover]` as
/// strings, newest first.
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
            .map_err(|_| ExchangeError::Parse(format!("bad time: {:?}", row[0])))?;
        let open = parse_price(&row[1], "open")?;
        let close = parse_price(&row[2], "close")?;
        let high = parse_price(&row[3], "high")?;
        let low = parse_price(&row[4], "low")?;
        candles.push(Candle::new(timestamp, open, high, low, close));
    }
    Ok(CandleSeries::from_wire(candles))
}
