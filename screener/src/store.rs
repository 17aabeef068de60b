//! Snapshot persistence: one CSV per completed cycle, pruned to a
//! retention count, plus optional raw kline side files for charting.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use shared::{AssetMetrics, CandleSeries, Exchange, Snapshot, SnapshotRow};
use tracing::debug;

use crate::Result;

const SNAPSHOT_PREFIX: &str = "snapshot_";
const SNAPSHOT_EXT: &str = ".csv";
const KLINES_DIR: &str = "klines";
const GAIN_PREFIX: &str = "gain_";

pub struct SnapshotStore {
    dir: PathBuf,
    retain: usize,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, retain: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating snapshot dir {}", dir.display()))?;
        Ok(Self {
            dir,
            retain: retain.max(1),
        })
    }

    /// Serialize one cycle's rows to `snapshot_<timestamp>.csv`. The
    /// file appears atomically: written to a temp name in the same
    /// directory, then renamed, so a concurrent reader never sees a
    /// half-written snapshot.
    pub fn write(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let final_path = self.snapshot_path(snapshot.timestamp);
        let tmp_path = final_path.with_extension("csv.tmp");

        let labels: Vec<String> = snapshot
            .rows
            .first()
            .map(|row| row.metrics.gains.keys().cloned().collect())
            .unwrap_or_default();

        let mut writer = csv::Writer::from_path(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;

        let mut header: Vec<String> = ["name", "symbol", "exchange", "tier", "watchlist"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(labels.iter().map(|l| format!("{GAIN_PREFIX}{l}")));
        header.push("trend_strength".to_string());
        header.push("pump_strength".to_string());
        writer.write_record(&header)?;

        for row in &snapshot.rows {
            let watchlist = if row.watchlist { "1" } else { "0" };
            let mut record = vec![
                row.name.clone(),
                row.symbol.clone(),
                row.exchange.to_string(),
                row.tier.to_string(),
                watchlist.to_string(),
            ];
            for label in &labels {
                record.push(metric_field(row.metrics.gains.get(label).copied().flatten()));
            }
            record.push(metric_field(row.metrics.trend_strength));
            record.push(metric_field(row.metrics.pump_strength));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("publishing {}", final_path.display()))?;
        debug!(path = %final_path.display(), rows = snapshot.rows.len(), "snapshot written");
        Ok(final_path)
    }

    /// Delete everything but the `retain` newest snapshots, ordered by
    /// the timestamp embedded in the filename. Returns how many files
    /// were removed.
    pub fn prune(&self) -> Result<usize> {
        let mut stamped = self.list_snapshots()?;
        if stamped.len() <= self.retain {
            return Ok(0);
        }
        stamped.sort_by_key(|(timestamp, _)| std::cmp::Reverse(*timestamp));

        let mut removed = 0;
        for (_, path) in stamped.drain(self.retain..) {
            fs::remove_file(&path)
                .with_context(|| format!("removing {}", path.display()))?;
            removed += 1;
        }
        Ok(removed)
    }

    /// The newest snapshot on disk, or `None` before the first cycle.
    pub fn load_latest(&self) -> Result<Option<Snapshot>> {
        let stamped = self.list_snapshots()?;
        let Some((timestamp, path)) = stamped.into_iter().max_by_key(|(ts, _)| *ts) else {
            return Ok(None);
        };
        self.load_file(timestamp, &path).map(Some)
    }

    /// Overwrite the raw kline side file for one asset
    /// (`klines/<name>.csv`), same atomic replace as snapshots.
    pub fn write_klines(&self, name: &str, series: &CandleSeries) -> Result<PathBuf> {
        let dir = self.dir.join(KLINES_DIR);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        let safe_name = name.replace(['/', '\\'], "-");
        let final_path = dir.join(format!("{safe_name}.csv"));
        let tmp_path = final_path.with_extension("csv.tmp");

        let mut writer = csv::Writer::from_path(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        writer.write_record(["timestamp", "open", "high", "low", "close"])?;
        for candle in series.candles() {
            writer.write_record([
                candle.timestamp.to_string(),
                candle.open.to_string(),
                candle.high.to_string(),
                candle.low.to_string(),
                candle.close.to_string(),
            ])?;
        }
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp_path, &final_path)
            .with_context(|| format!("publishing {}", final_path.display()))?;
        Ok(final_path)
    }

    fn snapshot_path(&self, timestamp: i64) -> PathBuf {
        self.dir
            .join(format!("{SNAPSHOT_PREFIX}{timestamp}{SNAPSHOT_EXT}"))
    }

    /// All `snapshot_<ts>.csv` files with their parsed timestamps.
    /// Files that merely look similar (temp leftovers, foreign names)
    /// are ignored.
    fn list_snapshots(&self) -> Result<Vec<(i64, PathBuf)>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("listing {}", self.dir.display()))?
        {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            let Some(stem) = name
                .strip_prefix(SNAPSHOT_PREFIX)
                .and_then(|rest| rest.strip_suffix(SNAPSHOT_EXT))
            else {
                continue;
            };
            if let Ok(timestamp) = stem.parse::<i64>() {
                found.push((timestamp, entry.path()));
            }
        }
        Ok(found)
    }

    fn load_file(&self, timestamp: i64, path: &Path) -> Result<Snapshot> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;

        // Recover gain labels from the header.
        let headers = reader.headers()?.clone();
        let labels: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| {
                h.strip_prefix(GAIN_PREFIX)
                    .map(|label| (i, label.to_string()))
            })
            .collect();
        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| anyhow!("{}: missing column {name}", path.display()))
        };
        let name_col = column("name")?;
        let symbol_col = column("symbol")?;
        let exchange_col = column("exchange")?;
        let tier_col = column("tier")?;
        let watchlist_col = column("watchlist")?;
        let trend_col = column("trend_strength")?;
        let pump_col = column("pump_strength")?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let get = |i: usize| record.get(i).unwrap_or("");

            let exchange_raw = get(exchange_col);
            let exchange = Exchange::parse(exchange_raw)
                .ok_or_else(|| anyhow!("{}: bad exchange {exchange_raw:?}", path.display()))?;

            let mut gains = BTreeMap::new();
            for (index, label) in &labels {
                gains.insert(label.clone(), parse_metric(get(*index))?);
            }

            let tier_raw = get(tier_col);
            rows.push(SnapshotRow {
                name: get(name_col).to_string(),
                symbol: get(symbol_col).to_string(),
                exchange,
                tier: tier_raw
                    .parse()
                    .map_err(|_| anyhow!("{}: bad tier {tier_raw:?}", path.display()))?,
                watchlist: get(watchlist_col) == "1",
                metrics: AssetMetrics {
                    gains,
                    trend_strength: parse_metric(get(trend_col))?,
                    pump_strength: parse_metric(get(pump_col))?,
                },
            });
        }

        Ok(Snapshot { timestamp, rows })
    }
}

/// Unavailable metrics serialize as empty fields.
fn metric_field(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_metric(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| anyhow!("bad metric value {raw:?}"))
}
