//! Periodic full invalidation of the tile cache.
//!
//! Source data may be re-aggregated at any time (new timesteps appended), so
//! no cached tile may outlive one wipe interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::TileCache;

/// Configuration for the wipe task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheWiperConfig {
    /// Time between wipes
    pub interval: Duration,
}

impl Default for CacheWiperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl CacheWiperConfig {
    /// Load from `TILE_CACHE_WIPE_INTERVAL_SECS` (default 60).
    pub fn from_env() -> Self {
        let interval_secs = std::env::var("TILE_CACHE_WIPE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(60);

        Self {
            interval: Duration::from_secs(interval_secs),
        }
    }
}

/// Background task that wipes the [`TileCache`] on a fixed period.
pub struct CacheWiper {
    cache: Arc<TileCache>,
    config: CacheWiperConfig,
}

impl CacheWiper {
    pub fn new(cache: Arc<TileCache>, config: CacheWiperConfig) -> Self {
        Self { cache, config }
    }

    /// Seconds since the epoch at which the last wipe ran.
    ///
    /// Before the first wipe this is the time the cache was created.
    pub fn time_last_ran(&self) -> f64 {
        self.cache.time_last_wiped()
    }

    /// Run on a dedicated tokio task until `shutdown` becomes `true` or its
    /// sender is dropped.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.interval;
        info!(interval_secs = period.as_secs_f64(), "Starting tile cache wiper");

        // First wipe one full interval after start
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dropped = self.cache.wipe().await;
                    debug!(
                        entries = dropped,
                        time_last_ran = self.time_last_ran(),
                        "Tile cache wipe cycle complete"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Stopping tile cache wiper");
                        break;
                    }
                }
            }
        }
    }
}
