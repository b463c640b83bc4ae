//! Allocation gateway: the per-session serialization boundary.
//!
//! Every mutating operation runs inside [`AllocationGateway::with_session_lock`],
//! which holds one `parking_lot::Mutex` per session id. Operations on the same
//! session are totally ordered; different sessions never contend beyond the
//! brief lock-table lookup. Lock handles are created on first use and evicted
//! as soon as no caller holds or waits on them.
//!
//! Notifications and audit records are published after the session lock is
//! released, so a slow dispatcher never extends the critical section.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SessionPolicy;
use crate::core::{
    build_audit_event, dispatch_all, AcceptError, AuditSink, Booking, BookingError, CapacityError,
    Effects, GatewayError, JoinError, JoinPreferences, LeaveError, NoopNotifier, Notification,
    Notifier, OfferError, SessionState, SessionStore, WaitlistEntry,
};
use crate::util::serde::{EntryId, SessionId};

/// Result of an allocation operation plus the notification intents it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    /// Operation result.
    pub value: T,
    /// Intents already handed to the gateway's notifier.
    pub notifications: Vec<Notification>,
}

type SessionLock = Arc<Mutex<()>>;

/// Serializes all allocation mutations per session.
pub struct AllocationGateway<S> {
    store: Arc<Mutex<S>>,
    locks: Mutex<HashMap<SessionId, SessionLock>>,
    notifier: Arc<dyn Notifier>,
    audit: Option<Arc<Mutex<Box<dyn AuditSink>>>>,
}

impl<S: SessionStore> AllocationGateway<S> {
    /// Create a gateway over a store, dropping notifications.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            locks: Mutex::new(HashMap::new()),
            notifier: Arc::new(NoopNotifier),
            audit: None,
        }
    }

    /// Attach a notification dispatcher.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Some(Arc::new(Mutex::new(audit)));
        self
    }

    /// Number of live per-session lock handles.
    #[must_use]
    pub fn live_locks(&self) -> usize {
        self.locks.lock().len()
    }

    fn lock_handle(&self, session_id: &str) -> SessionLock {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(session_id.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn release_handle(&self, session_id: &str, handle: SessionLock) {
        let mut locks = self.locks.lock();
        drop(handle);
        // Handles are only cloned under the table lock, so a count of one means
        // nobody else holds or waits on this session.
        if locks
            .get(session_id)
            .is_some_and(|h| Arc::strong_count(h) == 1)
        {
            locks.remove(session_id);
        }
    }

    fn locked<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState, &mut Effects) -> R,
    ) -> Result<(R, Effects), GatewayError> {
        let handle = self.lock_handle(session_id);
        let result = {
            let _guard = handle.lock();
            self.run_locked(session_id, f)
        };
        self.release_handle(session_id, handle);
        result
    }

    fn run_locked<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState, &mut Effects) -> R,
    ) -> Result<(R, Effects), GatewayError> {
        let mut state = self
            .store
            .lock()
            .load(session_id)?
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_owned()))?;
        let mut fx = Effects::default();
        let value = f(&mut state, &mut fx);
        debug_assert!(
            state.check_invariants().is_ok(),
            "session {session_id} invariant broken: {:?}",
            state.check_invariants()
        );
        self.store.lock().save(state)?;
        Ok((value, fx))
    }

    fn publish(&self, session_id: &str, fx: &Effects) {
        if let Some(audit) = &self.audit {
            let mut sink = audit.lock();
            for t in &fx.transitions {
                sink.record(build_audit_event(
                    session_id,
                    t.subject_id.clone(),
                    t.entry_id,
                    t.action,
                    None,
                ));
            }
        }
        dispatch_all(self.notifier.as_ref(), &fx.notifications);
    }

    /// Run `f` with exclusive access to one session.
    ///
    /// The session is loaded, handed to `f`, and saved back whatever `f`
    /// returns, so `f` must not mutate state on paths where it reports failure
    /// unless that mutation is meant to stick. Effects are published once the
    /// lock is released.
    ///
    /// # Errors
    ///
    /// [`GatewayError::SessionNotFound`] for unknown sessions, store failures.
    pub fn with_session_lock<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState, &mut Effects) -> R,
    ) -> Result<Outcome<R>, GatewayError> {
        let (value, fx) = self.locked(session_id, f)?;
        self.publish(session_id, &fx);
        Ok(Outcome {
            value,
            notifications: fx.notifications,
        })
    }

    fn run<T, E: From<GatewayError>>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState, &mut Effects) -> Result<T, E>,
    ) -> Result<Outcome<T>, E> {
        let outcome = self.with_session_lock(session_id, f)?;
        outcome.value.map(|value| Outcome {
            value,
            notifications: outcome.notifications,
        })
    }

    fn session_of(&self, entry_id: EntryId) -> Result<Option<SessionId>, GatewayError> {
        self.store.lock().locate_entry(entry_id)
    }

    /// Register a session.
    ///
    /// # Errors
    ///
    /// [`GatewayError::SessionExists`] if the id is taken.
    pub fn register_session(&self, state: SessionState) -> Result<(), GatewayError> {
        let session_id = state.id().to_owned();
        let handle = self.lock_handle(&session_id);
        let result = {
            let _guard = handle.lock();
            self.store.lock().insert(state)
        };
        self.release_handle(&session_id, handle);
        if result.is_ok() {
            tracing::info!(%session_id, "session registered");
        }
        result
    }

    /// Consistent copy of a session.
    ///
    /// # Errors
    ///
    /// [`GatewayError::SessionNotFound`] for unknown sessions.
    pub fn snapshot(&self, session_id: &str) -> Result<SessionState, GatewayError> {
        Ok(self.with_session_lock(session_id, |s, _| s.clone())?.value)
    }

    /// Every registered session id.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn session_ids(&self) -> Result<Vec<SessionId>, GatewayError> {
        self.store.lock().session_ids()
    }

    pub(crate) fn sessions_with_due_offers(
        &self,
        now_ms: u128,
    ) -> Result<Vec<SessionId>, GatewayError> {
        self.store.lock().sessions_with_due_offers(now_ms)
    }

    /// Queue a subject for a full session.
    ///
    /// # Errors
    ///
    /// See [`JoinError`].
    pub fn join_waitlist(
        &self,
        session_id: &str,
        subject_id: &str,
        prefs: JoinPreferences,
        now_ms: u128,
    ) -> Result<Outcome<WaitlistEntry>, JoinError> {
        self.run(session_id, |s, fx| s.join(subject_id, prefs, now_ms, fx))
    }

    /// Remove a subject from the queue; an outstanding offer counts as declined.
    ///
    /// # Errors
    ///
    /// [`LeaveError::NotQueued`] if the subject has no pending entry.
    pub fn leave_waitlist(
        &self,
        session_id: &str,
        subject_id: &str,
        now_ms: u128,
    ) -> Result<Outcome<WaitlistEntry>, LeaveError> {
        self.run(session_id, |s, fx| s.leave(subject_id, now_ms, fx))
    }

    /// Admin trigger: offer one unheld slot to the head of the queue.
    ///
    /// Works regardless of auto-promotion. `None` when no slot is free or
    /// nobody is queued.
    ///
    /// # Errors
    ///
    /// Gateway failures or an inconsistent queue.
    pub fn promote_next(
        &self,
        session_id: &str,
        now_ms: u128,
    ) -> Result<Outcome<Option<WaitlistEntry>>, OfferError> {
        self.run(session_id, |s, fx| s.make_offer(now_ms, fx))
    }

    /// Commit an outstanding offer. Payment must already be captured.
    ///
    /// # Errors
    ///
    /// See [`AcceptError`].
    pub fn accept_offer(
        &self,
        entry_id: EntryId,
        payment_confirmed: bool,
        now_ms: u128,
    ) -> Result<Outcome<Booking>, AcceptError> {
        let session_id = self.session_of(entry_id)?.ok_or(AcceptError::OfferNotFound)?;
        self.run(&session_id, |s, fx| {
            s.accept_offer(entry_id, payment_confirmed, now_ms, fx)
        })
    }

    /// The holder releases an offer.
    ///
    /// # Errors
    ///
    /// [`OfferError`] if the entry is unknown or holds no offer.
    pub fn decline_offer(
        &self,
        entry_id: EntryId,
        now_ms: u128,
    ) -> Result<Outcome<Vec<WaitlistEntry>>, OfferError> {
        let session_id = self
            .session_of(entry_id)?
            .ok_or(OfferError::EntryNotFound(entry_id))?;
        self.run(&session_id, |s, fx| s.decline_offer(entry_id, now_ms, fx))
    }

    /// Expire one session's overdue offers. Returns the expired entry ids.
    ///
    /// # Errors
    ///
    /// Gateway failures.
    pub fn expire_offers(
        &self,
        session_id: &str,
        now_ms: u128,
    ) -> Result<Outcome<Vec<EntryId>>, GatewayError> {
        self.with_session_lock(session_id, |s, fx| s.expire_due(now_ms, fx))
    }

    /// Called after a confirmed slot was released elsewhere.
    ///
    /// # Errors
    ///
    /// Gateway failures.
    pub fn on_capacity_freed(
        &self,
        session_id: &str,
        now_ms: u128,
    ) -> Result<Outcome<Vec<WaitlistEntry>>, GatewayError> {
        self.with_session_lock(session_id, |s, fx| s.on_capacity_freed(now_ms, fx))
    }

    /// Release a confirmed slot whose booking the engine does not track.
    ///
    /// Promotion is not triggered; follow with [`Self::on_capacity_freed`].
    ///
    /// # Errors
    ///
    /// [`CapacityError::NothingToRelease`] when no slot is confirmed,
    /// [`CapacityError::NoUntrackedSlot`] when every confirmed slot backs a
    /// booking made through [`Self::book`] or an accepted offer.
    pub fn release_slot(&self, session_id: &str) -> Result<Outcome<()>, CapacityError> {
        self.run(session_id, |s, _| s.release_slot())
    }

    /// Change a session's capacity and offer any new room.
    ///
    /// # Errors
    ///
    /// [`CapacityError::BelowConfirmed`] when shrinking below confirmed bookings,
    /// [`CapacityError::OffersOutstanding`] when shrinking into slots held by
    /// outstanding offers.
    pub fn capacity_changed(
        &self,
        session_id: &str,
        capacity: u32,
        now_ms: u128,
    ) -> Result<Outcome<Vec<WaitlistEntry>>, CapacityError> {
        self.run(session_id, |s, fx| s.set_capacity(capacity, now_ms, fx))
    }

    /// Book directly when an unheld slot is free and nobody is queued.
    ///
    /// # Errors
    ///
    /// See [`BookingError`].
    pub fn book(
        &self,
        session_id: &str,
        subject_id: &str,
        now_ms: u128,
    ) -> Result<Outcome<Booking>, BookingError> {
        self.run(session_id, |s, fx| s.book(subject_id, now_ms, fx))
    }

    /// Cancel an engine-tracked booking and promote into the freed slot.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotBooked`] if the subject holds no booking.
    pub fn cancel_booking(
        &self,
        session_id: &str,
        subject_id: &str,
        now_ms: u128,
    ) -> Result<Outcome<Booking>, BookingError> {
        self.run(session_id, |s, fx| s.cancel_booking(subject_id, now_ms, fx))
    }

    /// Replace a session's waitlist policy.
    ///
    /// # Errors
    ///
    /// Gateway failures.
    pub fn update_policy(
        &self,
        session_id: &str,
        policy: SessionPolicy,
    ) -> Result<Outcome<()>, GatewayError> {
        self.with_session_lock(session_id, |s, _| s.set_policy(policy))
    }

    /// Close a session to joins, bookings, and offers.
    ///
    /// # Errors
    ///
    /// Gateway failures.
    pub fn close_session(&self, session_id: &str) -> Result<Outcome<()>, GatewayError> {
        self.with_session_lock(session_id, |s, _| s.close())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AuditEvent, EntryStatus, RecordingNotifier};
    use crate::infra::store::InMemorySessionStore;

    struct SharedSink(Arc<Mutex<Vec<AuditEvent>>>);

    impl AuditSink for SharedSink {
        fn record(&mut self, event: AuditEvent) {
            self.0.lock().push(event);
        }
    }

    fn gateway() -> AllocationGateway<InMemorySessionStore> {
        let gw = AllocationGateway::new(InMemorySessionStore::new());
        gw.register_session(SessionState::new("s1", 1, 1, SessionPolicy::default()).unwrap())
            .unwrap();
        gw
    }

    #[test]
    fn test_unknown_session() {
        let gw = gateway();
        assert_eq!(
            gw.join_waitlist("nope", "a", JoinPreferences::default(), 0),
            Err(JoinError::Gateway(GatewayError::SessionNotFound("nope".into())))
        );
        assert_eq!(gw.live_locks(), 0);
    }

    #[test]
    fn test_register_twice() {
        let gw = gateway();
        assert!(matches!(
            gw.register_session(
                SessionState::new("s1", 1, 0, SessionPolicy::default()).unwrap()
            ),
            Err(GatewayError::SessionExists(_))
        ));
    }

    #[test]
    fn test_locks_evicted_when_idle() {
        let gw = gateway();
        gw.join_waitlist("s1", "a", JoinPreferences::default(), 0)
            .unwrap();
        assert_eq!(gw.live_locks(), 0);
    }

    #[test]
    fn test_failed_operation_publishes_nothing() {
        let notifier = Arc::new(RecordingNotifier::new());
        let gw = gateway().with_notifier(notifier.clone());
        let prefs = JoinPreferences {
            notify_on_join: true,
            notify_on_position_change: true,
        };
        gw.join_waitlist("s1", "a", prefs, 0).unwrap();
        assert!(gw.join_waitlist("s1", "a", prefs, 1).is_err());
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn test_unknown_entry() {
        let gw = gateway();
        let ghost = crate::util::serde::new_entry_id();
        assert_eq!(
            gw.accept_offer(ghost, true, 0),
            Err(AcceptError::OfferNotFound)
        );
        assert_eq!(
            gw.decline_offer(ghost, 0),
            Err(OfferError::EntryNotFound(ghost))
        );
    }

    #[test]
    fn test_audit_trail() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let gw = gateway().with_audit(Box::new(SharedSink(Arc::clone(&events))));
        let a = gw
            .join_waitlist("s1", "a", JoinPreferences::default(), 0)
            .unwrap()
            .value;
        gw.release_slot("s1").unwrap();
        gw.on_capacity_freed("s1", 1).unwrap();
        gw.accept_offer(a.id, true, 2).unwrap();
        let snap = gw.snapshot("s1").unwrap();
        assert_eq!(snap.queue().find(a.id).unwrap().status, EntryStatus::Promoted);
        assert_eq!(snap.ledger().confirmed(), 1);
        let actions: Vec<String> = events.lock().iter().map(|e| e.action.clone()).collect();
        assert_eq!(actions, vec!["join", "offer", "promote"]);
        assert!(events.lock().iter().all(|e| e.entry_id == Some(a.id)));
    }

    #[test]
    fn test_closed_session_stops_promotion() {
        let gw = gateway();
        gw.join_waitlist("s1", "a", JoinPreferences::default(), 0)
            .unwrap();
        gw.close_session("s1").unwrap();
        gw.release_slot("s1").unwrap();
        assert!(gw.on_capacity_freed("s1", 1).unwrap().value.is_empty());
        assert_eq!(gw.promote_next("s1", 1).unwrap().value, None);
    }
}
