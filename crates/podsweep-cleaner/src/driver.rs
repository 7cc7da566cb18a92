//! Driver: waits for the cache, then runs cycles once or on a period.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cycle::PodCleaner;
use crate::error::{CleanerError, CleanerResult};
use crate::signal;

/// How often the cache sync flag is polled.
pub const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run a single cycle and return.
    OneShot,
    /// Run a cycle every period until shutdown.
    Interval(Duration),
}

impl RunMode {
    /// A zero period means one-shot.
    pub fn from_interval(period: Duration) -> Self {
        if period.is_zero() {
            Self::OneShot
        } else {
            Self::Interval(period)
        }
    }
}

pub struct Driver {
    cleaner: PodCleaner,
    mode: RunMode,
    sync_timeout: Option<Duration>,
}

impl Driver {
    pub fn new(cleaner: PodCleaner, mode: RunMode) -> Self {
        Self {
            cleaner,
            mode,
            sync_timeout: None,
        }
    }

    /// Give up waiting for the cache after `timeout`. Zero waits forever.
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Wait for the cache, then run cycles until done or shut down.
    ///
    /// Returns the number of cycles started. Fails only if the cache never
    /// synced.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> CleanerResult<u64> {
        self.wait_for_cache_sync(&mut shutdown).await?;

        match self.mode {
            RunMode::OneShot => {
                info!("running single cleaning cycle");
                self.cleaner.run_cycle(&shutdown).await;
                Ok(1)
            }
            RunMode::Interval(period) => self.run_interval(period, shutdown).await,
        }
    }

    async fn run_interval(&self, period: Duration, mut shutdown: watch::Receiver<bool>) -> CleanerResult<u64> {
        info!(interval = ?period, "starting periodic cleaning");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = signal::shutdown_requested(&mut shutdown) => {
                    info!(cycles, "periodic cleaning stopped");
                    return Ok(cycles);
                }
                _ = ticker.tick() => {}
            }

            if signal::is_shutdown(&shutdown) {
                info!(cycles, "periodic cleaning stopped");
                return Ok(cycles);
            }

            cycles += 1;
            let report = self.cleaner.run_cycle(&shutdown).await;
            debug!(
                cycle = cycles,
                deleted = report.deleted.len(),
                verification = ?report.verification,
                "cycle complete"
            );
        }
    }

    async fn wait_for_cache_sync(&self, shutdown: &mut watch::Receiver<bool>) -> CleanerResult<()> {
        if signal::is_shutdown(shutdown) {
            return Err(CleanerError::CacheSync("shutdown requested".to_string()));
        }
        if self.cleaner.cache().has_synced() {
            return Ok(());
        }

        info!("waiting for pod cache to sync");
        let started = Instant::now();
        let deadline = self.sync_timeout.map(|t| started + t);

        let mut poll = tokio::time::interval(SYNC_POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = signal::shutdown_requested(shutdown) => {
                    warn!("shutdown requested before pod cache synced");
                    return Err(CleanerError::CacheSync("shutdown requested".to_string()));
                }
                _ = poll.tick() => {}
            }

            if self.cleaner.cache().has_synced() {
                info!(waited = ?started.elapsed(), "pod cache ready");
                return Ok(());
            }

            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(CleanerError::CacheSync(format!(
                        "timed out after {:?}",
                        deadline - started
                    )));
                }
            }
        }
    }
}
