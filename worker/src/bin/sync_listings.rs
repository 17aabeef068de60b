//! One-shot maintenance tool: scan Binance spot and USD-M futures
//! listings and append anything missing to the assets file with
//! default values (tier 4, not watchlisted).

use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::Deserialize;
use shared::{load_assets, save_assets, AssetConfig, Config, Exchange};
use tracing::info;

const SPOT_INFO_URL: &str = "https://api.binance.com/api/v3/exchangeInfo";
const FUTURES_INFO_URL: &str = "https://fapi.binance.com/fapi/v1/exchangeInfo";

/// Leveraged tokens and renamed perpetuals that must not become assets.
const IGNORED_NAMES: [&str; 12] = [
    "ADADOWN", "ADAUP", "BNBDOWN", "BNBUP", "BTCDOWN", "BTCUP", "ETHDOWN", "ETHUP", "1000LUNC",
    "1000PEPE", "1000SHIB", "1000XEC",
];

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    contract_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::from_env()?;
    let mut assets = load_assets(&config.assets_file, config.kline_interval_minutes)?;
    let mut known: HashSet<String> = assets.iter().map(|a| a.name.clone()).collect();

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let mut added = 0;

    // Spot pairs, USDT quotes first so they win the symbol choice.
    let spot = fetch_info(&http, SPOT_INFO_URL).await?;
    for quote in ["USDT", "BTC"] {
        for entry in &spot.symbols {
            if entry.quote_asset == quote && entry.status == "TRADING" {
                added += add_if_new(&mut assets, &mut known, entry, &config);
            }
        }
    }

    // Perpetuals, for assets that never listed on spot.
    let futures = fetch_info(&http, FUTURES_INFO_URL).await?;
    for entry in &futures.symbols {
        if entry.quote_asset == "USDT"
            && entry.status == "TRADING"
            && entry.contract_type.as_deref() == Some("PERPETUAL")
        {
            added += add_if_new(&mut assets, &mut known, entry, &config);
        }
    }

    if added == 0 {
        info!("no new listings");
        return Ok(());
    }

    assets.sort_by(|a, b| a.name.cmp(&b.name));
    save_assets(&config.assets_file, &assets)?;
    info!(
        added,
        path = %config.assets_file.display(),
        "assets file updated"
    );
    Ok(())
}

async fn fetch_info(http: &reqwest::Client, url: &str) -> Result<ExchangeInfo> {
    let response = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .with_context(|| format!("requesting {url}"))?;
    response
        .json::<ExchangeInfo>()
        .await
        .with_context(|| format!("decoding {url}"))
}

fn add_if_new(
    assets: &mut Vec<AssetConfig>,
    known: &mut HashSet<String>,
    entry: &SymbolInfo,
    config: &Config,
) -> usize {
    let name = entry.base_asset.as_str();
    if IGNORED_NAMES.contains(&name) || known.contains(name) {
        return 0;
    }

    info!(name, symbol = %entry.symbol, "new listing");
    known.insert(name.to_string());
    assets.push(AssetConfig {
        name: name.to_string(),
        symbol: entry.symbol.clone(),
        exchange: Exchange::Binance,
        tier: 4,
        watchlist: false,
        interval_minutes: config.kline_interval_minutes,
    });
    1
}
