//! Expiry reaper sweep.
//!
//! One periodic scan replaces per-offer timers. Each due session is expired
//! through the gateway on its own; a failure (or panic) in one session is
//! logged and counted and the sweep moves on. Acceptance re-checks deadlines,
//! so a late sweep only delays re-promotion.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::core::{AllocationGateway, SessionStore};
use crate::util::serde::SessionId;

/// Abstraction for spawning background work on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Summary of one reaper sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaperReport {
    /// Sessions that had a due offer.
    pub sessions_scanned: usize,
    /// Offers moved to `Expired`.
    pub offers_expired: usize,
    /// Replacement offers made after expiry.
    pub offers_made: usize,
    /// Sessions whose expiry failed, with the reason.
    pub failures: Vec<(SessionId, String)>,
}

impl<S: SessionStore> AllocationGateway<S> {
    /// Expire every due offer across all sessions.
    ///
    /// Never fails as a whole: store or session failures are reported in
    /// [`ReaperReport::failures`].
    pub fn on_reaper_tick(&self, now_ms: u128) -> ReaperReport {
        let mut report = ReaperReport::default();
        let due = match self.sessions_with_due_offers(now_ms) {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "reaper could not list due sessions");
                report.failures.push((String::new(), e.to_string()));
                return report;
            }
        };

        for session_id in due {
            report.sessions_scanned += 1;
            match catch_unwind(AssertUnwindSafe(|| self.expire_offers(&session_id, now_ms))) {
                Ok(Ok(outcome)) => {
                    report.offers_expired += outcome.value.len();
                    report.offers_made += outcome
                        .notifications
                        .iter()
                        .filter(|n| matches!(n.event, crate::core::NotificationEvent::OfferMade { .. }))
                        .count();
                }
                Ok(Err(e)) => {
                    tracing::warn!(%session_id, error = %e, "reaper skipped session");
                    report.failures.push((session_id, e.to_string()));
                }
                Err(_) => {
                    tracing::error!(%session_id, "reaper recovered from panic in session");
                    report.failures.push((session_id, "panic during expiry".into()));
                }
            }
        }

        if report.offers_expired > 0 || !report.failures.is_empty() {
            tracing::info!(
                sessions = report.sessions_scanned,
                expired = report.offers_expired,
                promoted = report.offers_made,
                failures = report.failures.len(),
                "reaper sweep finished"
            );
        } else {
            tracing::debug!("reaper sweep found nothing due");
        }
        report
    }
}
