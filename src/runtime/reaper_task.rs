//! Background task driving [`AllocationGateway::on_reaper_tick`] on a timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::config::AllocationConfig;
use crate::core::{AllocationGateway, ReaperReport, SessionStore, Spawn};
use crate::util::clock::now_ms;

/// Periodic expiry sweep over every session of a gateway.
pub struct ExpiryReaper<S> {
    gateway: Arc<AllocationGateway<S>>,
    interval: Duration,
}

/// Control handle for a running reaper. Dropping it stops the reaper.
pub struct ReaperHandle {
    stop: watch::Sender<bool>,
    ticks: Arc<AtomicU64>,
    last_report: Arc<Mutex<ReaperReport>>,
}

impl ReaperHandle {
    /// Ask the reaper to stop after its current sweep.
    pub fn shutdown(&self) {
        let _ = self.stop.send(true);
    }

    /// Completed sweeps so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Report of the most recent sweep.
    #[must_use]
    pub fn last_report(&self) -> ReaperReport {
        self.last_report.lock().clone()
    }
}

impl<S> ExpiryReaper<S>
where
    S: SessionStore + 'static,
{
    /// Reaper sweeping every `interval`.
    pub const fn new(gateway: Arc<AllocationGateway<S>>, interval: Duration) -> Self {
        Self { gateway, interval }
    }

    /// Reaper using the configured sweep interval.
    pub const fn from_config(gateway: Arc<AllocationGateway<S>>, cfg: &AllocationConfig) -> Self {
        Self::new(gateway, Duration::from_secs(cfg.reaper_interval_secs))
    }

    /// Start sweeping on the given spawner. The first sweep runs immediately.
    pub fn spawn<Sp: Spawn>(self, spawner: &Sp) -> ReaperHandle {
        let (stop, mut stop_rx) = watch::channel(false);
        let ticks = Arc::new(AtomicU64::new(0));
        let last_report = Arc::new(Mutex::new(ReaperReport::default()));
        let handle = ReaperHandle {
            stop,
            ticks: Arc::clone(&ticks),
            last_report: Arc::clone(&last_report),
        };
        let Self { gateway, interval } = self;

        spawner.spawn(async move {
            tracing::info!(interval_ms = interval.as_millis(), "expiry reaper started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = gateway.on_reaper_tick(now_ms());
                        *last_report.lock() = report;
                        ticks.fetch_add(1, Ordering::AcqRel);
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("expiry reaper stopped");
        });
        handle
    }
}
