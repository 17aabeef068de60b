//! Minute ticker that triggers cycles and watches the parent process.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike};
use tracing::{info, warn};

use crate::cycle::Screener;

/// Decides whether the worker should keep running.
pub trait LivenessProbe: Send + Sync {
    fn is_alive(&self) -> bool;
}

/// Alive while the process that spawned us is. After the parent dies
/// the worker is re-parented and the current parent pid no longer
/// matches the one captured at startup (unix; elsewhere it never fires).
pub struct ParentProbe {
    initial_parent: u32,
}

impl ParentProbe {
    pub fn new() -> Self {
        Self {
            initial_parent: current_parent(),
        }
    }
}

impl Default for ParentProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessProbe for ParentProbe {
    fn is_alive(&self) -> bool {
        current_parent() == self.initial_parent
    }
}

#[cfg(unix)]
fn current_parent() -> u32 {
    std::os::unix::process::parent_id()
}

#[cfg(not(unix))]
fn current_parent() -> u32 {
    0
}

/// Probe for deployments without a supervising parent.
pub struct NeverExit;

impl LivenessProbe for NeverExit {
    fn is_alive(&self) -> bool {
        true
    }
}

pub struct CycleScheduler {
    screener: Arc<Screener>,
    cadence_minutes: u32,
    probe: Box<dyn LivenessProbe>,
}

impl CycleScheduler {
    pub fn new(
        screener: Arc<Screener>,
        cadence_minutes: u32,
        probe: Box<dyn LivenessProbe>,
    ) -> Self {
        Self {
            screener,
            cadence_minutes: cadence_minutes.max(1),
            probe,
        }
    }

    /// Tick once a minute until the probe reports the parent gone. A
    /// tick on a matching minute triggers a cycle unless one is already
    /// running, in which case the trigger is skipped, not queued. The
    /// earliest trigger is one full minute after start.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so a start
        // on a matching minute does not trigger straight away.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if !self.probe.is_alive() {
                info!("parent process gone, shutting down");
                return;
            }
            if !due(Local::now().minute(), self.cadence_minutes) {
                continue;
            }
            match self.screener.try_run_cycle().await {
                Some(Ok(timestamp)) => info!(timestamp, "scheduled cycle complete"),
                Some(Err(err)) => warn!(error = %err, "scheduled cycle failed"),
                None => info!("cycle already running, skipping trigger"),
            }
        }
    }
}

fn due(minute: u32, cadence: u32) -> bool {
    minute % cadence == 0
}
