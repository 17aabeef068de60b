//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;

use dotenv::dotenv;

use crate::error::ConfigError;
use crate::models::Lookback;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for the assets file, snapshots and kline side files.
    pub data_dir: PathBuf,
    pub assets_file: PathBuf,
    /// Default candle interval for assets that do not set their own.
    pub kline_interval_minutes: u32,
    /// Candles requested per asset per cycle.
    pub kline_count: usize,
    pub lookbacks: Vec<Lookback>,
    /// Upper bound on concurrent venue requests.
    pub fetch_max_in_flight: usize,
    pub fetch_timeout_secs: u64,
    /// Snapshots kept on disk after each prune.
    pub snapshot_retain: usize,
    /// Also write raw per-asset kline files for charting.
    pub write_klines: bool,
    /// Scheduler fires when the wall-clock minute is a multiple of this.
    pub cycle_cadence_minutes: u32,
    /// Exit the worker when its parent process goes away.
    pub watch_parent: bool,
    pub api_addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let data_dir = PathBuf::from(
            std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        );
        let assets_file = match std::env::var("ASSETS_FILE") {
            Ok(path) => PathBuf::from(path),
            Err(_) => data_dir.join("assets.csv"),
        };
        let lookbacks = parse_lookbacks(
            &std::env::var("LOOKBACKS").unwrap_or_else(|_| "1d:6,3d:18,1w:42".to_string()),
        )?;

        Ok(Config {
            data_dir,
            assets_file,
            kline_interval_minutes: env_parse("KLINE_INTERVAL_MINUTES", 240)?,
            kline_count: env_parse("KLINE_COUNT", 200)?,
            lookbacks,
            fetch_max_in_flight: env_parse("FETCH_MAX_IN_FLIGHT", 10)?,
            fetch_timeout_secs: env_parse("FETCH_TIMEOUT_SECS", 10)?,
            snapshot_retain: env_parse("SNAPSHOT_RETAIN", 2)?,
            write_klines: env_parse("WRITE_KLINES", true)?,
            cycle_cadence_minutes: env_parse("CYCLE_CADENCE_MINUTES", 5)?,
            watch_parent: env_parse("WATCH_PARENT", true)?,
            api_addr: std::env::var("API_ADDR").unwrap_or_else(|_| "0.0.0.0:9999".to_string()),
        })
    }
}

/// Read an env var, falling back to `default` when unset. A set but
/// unparsable value is a hard error rather than a silent default.
fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
            name: name.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Parse `"1d:6,3d:18,1w:42"` into named lookbacks.
pub fn parse_lookbacks(raw: &str) -> Result<Vec<Lookback>, ConfigError> {
    let invalid = || ConfigError::InvalidVar {
        name: "LOOKBACKS".to_string(),
        value: raw.to_string(),
    };

    let mut lookbacks = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (label, count) = part.split_once(':').ok_or_else(invalid)?;
        let candles: usize = count.trim().parse().map_err(|_| invalid())?;
        if label.trim().is_empty() || candles == 0 {
            return Err(invalid());
        }
        lookbacks.push(Lookback::new(label.trim(), candles));
    }
    if lookbacks.is_empty() {
        return Err(invalid());
    }
    Ok(lookbacks)
}
