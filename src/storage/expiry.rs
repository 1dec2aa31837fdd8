//! Background Expiry Sweeper
//!
//! Lazy expiry (checking on access) only reclaims keys that someone still
//! reads. A key that expires and is never touched again would otherwise
//! sit in memory forever, so a background task periodically calls
//! [`Keyspace::sweep_expired`] to reclaim the rest.
//!
//! The sweep interval adapts: when a large fraction of keys is expiring
//! the sweeper speeds up, and when nothing is expiring it backs off to
//! save CPU.

use crate::storage::Keyspace;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Tuning knobs for the sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Starting interval between sweeps.
    pub base_interval: Duration,
    /// Floor for the adaptive interval.
    pub min_interval: Duration,
    /// Ceiling for the adaptive interval.
    pub max_interval: Duration,
    /// Speed up when at least this fraction of keys expired in a sweep.
    pub speedup_threshold: f64,
    /// Slow down when less than this fraction expired.
    pub slowdown_threshold: f64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

/// Handle to the running sweeper task. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper over `store` as a background tokio task.
    pub fn start(store: Arc<Keyspace>, config: SweeperConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(sweeper_loop(store, config, shutdown_rx));
        Self { shutdown_tx }
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    store: Arc<Keyspace>,
    config: SweeperConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("expiry sweeper shutting down");
                    return;
                }
            }
        }

        let keys_before = store.len();
        let reclaimed = store.sweep_expired();

        if keys_before > 0 {
            let rate = reclaimed as f64 / keys_before as f64;
            if rate > config.speedup_threshold {
                interval = (interval / 2).max(config.min_interval);
                debug!(reclaimed, interval_ms = interval.as_millis() as u64, "sweeper speeding up");
            } else if rate < config.slowdown_threshold && reclaimed == 0 {
                interval = (interval * 2).min(config.max_interval);
                trace!(interval_ms = interval.as_millis() as u64, "sweeper backing off");
            }
        }

        if reclaimed > 0 {
            debug!(reclaimed, remaining = store.len(), "expired keys reclaimed");
        }
    }
}

/// Starts the sweeper with default tuning.
pub fn start_expiry_sweeper(store: Arc<Keyspace>) -> ExpirySweeper {
    ExpirySweeper::start(store, SweeperConfig::default())
}
