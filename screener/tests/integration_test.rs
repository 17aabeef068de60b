//! End-to-end cycle tests: mock venue clients through to snapshot
//! files on disk.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use screener::exchange::{ClientRegistry, ExchangeClient};
use screener::Screener;
use shared::{
    save_assets, AssetConfig, Candle, CandleSeries, Config, Exchange, ExchangeError, Lookback,
};
use tokio::sync::Notify;

/// Serves a gently rising synthetic market.
struct StaticClient;

#[async_trait]
impl ExchangeClient for StaticClient {
    async fn fetch_candles(
        &self,
        _symbol: &str,
        interval_minutes: u32,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        let step = i64::from(interval_minutes) * 60;
        let candles = (0..count as i64)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.5;
                Candle::new(i * step, base, base + 2.0, base - 2.0, base + 1.0)
            })
            .collect();
        Ok(CandleSeries::from_wire(candles))
    }
}

struct FailingClient;

#[async_trait]
impl ExchangeClient for FailingClient {
    async fn fetch_candles(
        &self,
        _symbol: &str,
        _interval_minutes: u32,
        _count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        Err(ExchangeError::RateLimited)
    }
}

/// Signals `entered` when a fetch starts and holds it until `release`
/// fires, pinning a cycle mid-flight.
struct GatedClient {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl ExchangeClient for GatedClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        count: usize,
    ) -> Result<CandleSeries, ExchangeError> {
        self.entered.notify_one();
        self.release.notified().await;
        StaticClient.fetch_candles(symbol, interval_minutes, count).await
    }
}

fn test_config(dir: &Path) -> Config {
    Config {
        data_dir: dir.to_path_buf(),
        assets_file: dir.join("assets.csv"),
        kline_interval_minutes: 240,
        kline_count: 60,
        lookbacks: vec![
            Lookback::new("1d", 6),
            Lookback::new("3d", 18),
            Lookback::new("1w", 42),
        ],
        fetch_max_in_flight: 4,
        fetch_timeout_secs: 5,
        snapshot_retain: 2,
        write_klines: true,
        cycle_cadence_minutes: 5,
        watch_parent: false,
        api_addr: "127.0.0.1:0".to_string(),
    }
}

fn asset(name: &str, exchange: Exchange) -> AssetConfig {
    AssetConfig {
        name: name.to_string(),
        symbol: format!("{name}USDT"),
        exchange,
        tier: 1,
        watchlist: false,
        interval_minutes: 240,
    }
}

fn registry_with_failures() -> Arc<ClientRegistry> {
    let mut registry = ClientRegistry::new();
    registry.register(Exchange::Binance, Arc::new(StaticClient));
    registry.register(Exchange::Kucoin, Arc::new(StaticClient));
    registry.register(Exchange::Bybit, Arc::new(FailingClient));
    Arc::new(registry)
}

#[tokio::test]
async fn test_cycle_writes_snapshot_with_failed_asset_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    save_assets(
        &config.assets_file,
        &[
            asset("BTC", Exchange::Binance),
            asset("KDA", Exchange::Kucoin),
            asset("BAD", Exchange::Bybit),
        ],
    )
    .unwrap();

    let screener = Screener::new(config, registry_with_failures()).unwrap();
    let timestamp = screener.run_cycle().await.unwrap();

    let snapshot = screener.store().load_latest().unwrap().unwrap();
    assert_eq!(snapshot.timestamp, timestamp);

    let names: Vec<&str> = snapshot.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["BTC", "KDA"]);

    // 60 rising candles support every lookback and both other signals.
    for row in &snapshot.rows {
        assert!(row.metrics.gains["1d"].is_some());
        assert!(row.metrics.gains["3d"].is_some());
        assert!(row.metrics.gains["1w"].is_some());
        assert!(row.metrics.trend_strength.is_some());
        assert!(row.metrics.pump_strength.is_some());
    }

    // Kline side files exist for fetched assets only.
    assert!(dir.path().join("klines").join("BTC.csv").exists());
    assert!(dir.path().join("klines").join("KDA.csv").exists());
    assert!(!dir.path().join("klines").join("BAD.csv").exists());
}

#[tokio::test]
async fn test_cycle_fails_when_assets_file_is_bad() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::write(
        &config.assets_file,
        "name,symbol,exchange,tier,watchlist,interval_minutes\nFTT,FTTUSDT,ftx,1,0,240\n",
    )
    .unwrap();

    let screener = Screener::new(config, registry_with_failures()).unwrap();
    assert!(screener.run_cycle().await.is_err());
    assert!(screener.store().load_latest().unwrap().is_none());
}

#[tokio::test]
async fn test_manual_cycles_are_serialized_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    save_assets(&config.assets_file, &[asset("BTC", Exchange::Binance)]).unwrap();

    let screener = Arc::new(Screener::new(config, registry_with_failures()).unwrap());

    let first = tokio::spawn({
        let screener = Arc::clone(&screener);
        async move { screener.run_cycle().await }
    });
    let second = tokio::spawn({
        let screener = Arc::clone(&screener);
        async move { screener.run_cycle().await }
    });

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert!(screener.store().load_latest().unwrap().is_some());
}

#[tokio::test]
async fn test_busy_cycle_skips_trigger_instead_of_queueing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    save_assets(&config.assets_file, &[asset("BTC", Exchange::Binance)]).unwrap();

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut registry = ClientRegistry::new();
    registry.register(
        Exchange::Binance,
        Arc::new(GatedClient {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        }),
    );

    let screener = Arc::new(Screener::new(config, Arc::new(registry)).unwrap());
    let running = tokio::spawn({
        let screener = Arc::clone(&screener);
        async move { screener.run_cycle().await }
    });

    // While the first cycle sits inside its fetch, a trigger is refused
    // rather than queued behind it.
    entered.notified().await;
    assert!(screener.try_run_cycle().await.is_none());

    release.notify_one();
    assert!(running.await.unwrap().is_ok());

    // Pre-arm the gate so the next cycle's fetch passes straight through.
    release.notify_one();
    assert!(matches!(screener.try_run_cycle().await, Some(Ok(_))));
}

#[tokio::test]
async fn test_per_asset_interval_overrides_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut hourly = asset("SOL", Exchange::Binance);
    hourly.interval_minutes = 60;
    save_assets(&config.assets_file, &[hourly]).unwrap();

    let screener = Screener::new(config, registry_with_failures()).unwrap();
    screener.run_cycle().await.unwrap();

    // StaticClient spaces candles by the requested interval; the side
    // file reflects the hourly spacing.
    let body = std::fs::read_to_string(dir.path().join("klines").join("SOL.csv")).unwrap();
    let mut lines = body.lines().skip(1);
    let first: i64 = lines.next().unwrap().split(',').next().unwrap().parse().unwrap();
    let second: i64 = lines.next().unwrap().split(',').next().unwrap().parse().unwrap();
    assert_eq!(second - first, 3600);
}
