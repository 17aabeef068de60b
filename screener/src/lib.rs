//! Market screener engine.
//!
//! Pulls recent candle history for a configured set of assets from public
//! exchange APIs, derives per-asset signals (gain from low, EMA trend
//! strength, pump strength) and persists one snapshot file per cycle:
//!
//! - [`exchange`]: one client per venue behind the [`ExchangeClient`] trait
//! - [`fetch`]: bounded concurrent fan-out with per-asset failure isolation
//! - [`signals`]: pure metric functions over candle series
//! - [`store`]: atomic snapshot persistence with retention
//! - [`cycle`]: the runner gluing the above together
//! - [`scheduler`]: minute ticker with parent-process liveness

pub mod cycle;
pub mod exchange;
pub mod fetch;
pub mod scheduler;
pub mod signals;
pub mod store;

pub use cycle::Screener;
pub use exchange::{ClientRegistry, ExchangeClient};
pub use fetch::FetchOrchestrator;
pub use scheduler::{CycleScheduler, LivenessProbe, NeverExit, ParentProbe};
pub use signals::{compute_metrics, SignalConfig};
pub use store::SnapshotStore;

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
