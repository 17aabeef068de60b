//! Assets file: the CSV listing which pairs to screen and where.

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::models::{AssetConfig, Exchange};

const HEADERS: [&str; 6] = [
    "name",
    "symbol",
    "exchange",
    "tier",
    "watchlist",
    "interval_minutes",
];

/// Load and validate the assets file. `default_interval` fills the
/// `interval_minutes` column when it is blank or absent.
pub fn load_assets(path: &Path, default_interval: u32) -> Result<Vec<AssetConfig>, ConfigError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut seen = HashSet::new();
    let mut assets = Vec::new();

    for record in reader.records() {
        let record = record?;
        let name = required(&record, 0, "name")?.to_string();
        if !seen.insert(name.clone()) {
            return Err(ConfigError::MalformedAsset(format!(
                "duplicate asset name {name:?}"
            )));
        }

        let symbol = required(&record, 1, &name)?.to_string();
        let exchange_raw = required(&record, 2, &name)?;
        let exchange = Exchange::parse(exchange_raw).ok_or_else(|| {
            ConfigError::UnknownExchange {
                asset: name.clone(),
                exchange: exchange_raw.to_string(),
            }
        })?;
        let tier = parse_num(required(&record, 3, &name)?, "tier", &name)?;
        let watchlist = parse_flag(required(&record, 4, &name)?, &name)?;
        let interval_minutes = match record.get(5).map(str::trim) {
            None | Some("") => default_interval,
            Some(raw) => parse_num(raw, "interval_minutes", &name)?,
        };

        assets.push(AssetConfig {
            name,
            symbol,
            exchange,
            tier,
            watchlist,
            interval_minutes,
        });
    }

    Ok(assets)
}

/// Write the assets file back out in the canonical column order.
pub fn save_assets(path: &Path, assets: &[AssetConfig]) -> Result<(), ConfigError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADERS)?;
    for asset in assets {
        writer.write_record([
            asset.name.as_str(),
            asset.symbol.as_str(),
            asset.exchange.as_str(),
            &asset.tier.to_string(),
            if asset.watchlist { "1" } else { "0" },
            &asset.interval_minutes.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn required<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    context: &str,
) -> Result<&'a str, ConfigError> {
    match record.get(index).map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MalformedAsset(format!(
            "{context}: missing column {}",
            HEADERS.get(index).copied().unwrap_or("?")
        ))),
    }
}

fn parse_num<T: std::str::FromStr>(raw: &str, what: &str, asset: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| {
        ConfigError::MalformedAsset(format!("asset {asset:?}: bad {what} {raw:?}"))
    })
}

fn parse_flag(raw: &str, asset: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::MalformedAsset(format!(
            "asset {asset:?}: bad watchlist flag {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("assets.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_and_defaults_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "name,symbol,exchange,tier,watchlist,interval_minutes\n\
             BTC,BTCUSDT,binance,1,1,\n\
             KDA,KDA-USDT,kucoin,3,0,60\n",
        );

        let assets = load_assets(&path, 240).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].exchange, Exchange::Binance);
        assert_eq!(assets[0].interval_minutes, 240);
        assert!(assets[0].watchlist);
        assert_eq!(assets[1].interval_minutes, 60);
        assert!(!assets[1].watchlist);
    }

    #[test]
    fn rejects_unknown_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "name,symbol,exchange,tier,watchlist,interval_minutes\n\
             FTT,FTTUSDT,ftx,2,0,240\n",
        );

        match load_assets(&path, 240) {
            Err(ConfigError::UnknownExchange { asset, exchange }) => {
                assert_eq!(asset, "FTT");
                assert_eq!(exchange, "ftx");
            }
            other => panic!("expected UnknownExchange, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "name,symbol,exchange,tier,watchlist,interval_minutes\n\
             BTC,BTCUSDT,binance,1,1,240\n\
             BTC,BTC-USDT,kucoin,1,1,240\n",
        );

        assert!(matches!(
            load_assets(&path, 240),
            Err(ConfigError::MalformedAsset(_))
        ));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets.csv");
        let assets = vec![
            AssetConfig {
                name: "ETH".to_string(),
                symbol: "ETHUSDT".to_string(),
                exchange: Exchange::Bybit,
                tier: 2,
                watchlist: false,
                interval_minutes: 240,
            },
            AssetConfig {
                name: "HT".to_string(),
                symbol: "htusdt".to_string(),
                exchange: Exchange::Huobi,
                tier: 4,
                watchlist: true,
                interval_minutes: 1440,
            },
        ];

        save_assets(&path, &assets).unwrap();
        let loaded = load_assets(&path, 240).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].symbol, "ETHUSDT");
        assert_eq!(loaded[1].exchange, Exchange::Huobi);
        assert_eq!(loaded[1].interval_minutes, 1440);
        assert!(loaded[1].watchlist);
    }
}
