//! Session aggregate: ledger, waitlist, and confirmed bookings for one session.
//!
//! A `SessionState` is only ever mutated inside the gateway's per-session lock.
//! Offer state machine methods live in [`crate::core::offer`].

use serde::{Deserialize, Serialize};

use crate::config::SessionPolicy;
use crate::core::{
    BookingError, CapacityError, CapacityLedger, Dequeued, EntryStatus, JoinError, JoinPreferences,
    LeaveError, Notification, NotificationEvent, PositionChange, ReservationToken, WaitlistEntry,
    WaitlistQueue,
};
use crate::util::serde::{EntryId, SessionId, SubjectId};

/// Derived booking status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// At least one slot is unconfirmed.
    Open,
    /// Every slot is confirmed.
    Full,
    /// Closed by an admin; no joins, bookings, or offers.
    Closed,
}

/// A confirmed booking created by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Session booked.
    pub session_id: SessionId,
    /// Holder of the booking.
    pub subject_id: SubjectId,
    /// Waitlist entry the booking came from, if any.
    pub entry_id: Option<EntryId>,
    /// Ledger reservation backing the booking.
    pub token: ReservationToken,
    /// Confirmation time in milliseconds since epoch.
    pub confirmed_at_ms: u128,
}

/// A state change worth an audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Audit action name (`join`, `offer`, `promote`, ...).
    pub action: &'static str,
    /// Subject concerned.
    pub subject_id: SubjectId,
    /// Entry concerned, if the change went through the waitlist.
    pub entry_id: Option<EntryId>,
}

/// Side effects collected while an operation runs under the session lock.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Effects {
    /// Notification intents, in the order they were produced.
    pub notifications: Vec<Notification>,
    /// Audit-worthy transitions.
    pub transitions: Vec<Transition>,
}

impl Effects {
    pub(crate) fn notify(&mut self, session_id: &str, subject_id: &str, event: NotificationEvent) {
        self.notifications.push(Notification {
            session_id: session_id.to_owned(),
            subject_id: subject_id.to_owned(),
            event,
        });
    }

    pub(crate) fn record(&mut self, action: &'static str, subject_id: &str, entry_id: Option<EntryId>) {
        self.transitions.push(Transition {
            action,
            subject_id: subject_id.to_owned(),
            entry_id,
        });
    }

    pub(crate) fn moved(&mut self, session_id: &str, moves: Vec<PositionChange>) {
        for m in moves.into_iter().filter(|m| m.notify) {
            self.notify(
                session_id,
                &m.subject_id,
                NotificationEvent::PositionChanged {
                    entry_id: m.entry_id,
                    from: m.from,
                    to: m.to,
                },
            );
        }
    }
}

/// Everything the engine knows about one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub(crate) id: SessionId,
    pub(crate) policy: SessionPolicy,
    pub(crate) ledger: CapacityLedger,
    pub(crate) queue: WaitlistQueue,
    pub(crate) bookings: Vec<Booking>,
    pub(crate) closed: bool,
}

impl SessionState {
    /// Create a session with `confirmed` bookings made outside the engine.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::BelowConfirmed`] if `confirmed > capacity`.
    pub fn new(
        id: impl Into<SessionId>,
        capacity: u32,
        confirmed: u32,
        policy: SessionPolicy,
    ) -> Result<Self, CapacityError> {
        let id = id.into();
        Ok(Self {
            ledger: CapacityLedger::new(capacity, confirmed)?,
            queue: WaitlistQueue::new(id.clone()),
            id,
            policy,
            bookings: Vec::new(),
            closed: false,
        })
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waitlist policy.
    #[must_use]
    pub const fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Capacity ledger (read-only).
    #[must_use]
    pub const fn ledger(&self) -> &CapacityLedger {
        &self.ledger
    }

    /// Waitlist (read-only).
    #[must_use]
    pub const fn queue(&self) -> &WaitlistQueue {
        &self.queue
    }

    /// Bookings confirmed through the engine.
    #[must_use]
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Status recomputed from the ledger.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        if self.closed {
            SessionStatus::Closed
        } else if self.ledger.has_free_slot() {
            SessionStatus::Open
        } else {
            SessionStatus::Full
        }
    }

    /// Free ledger slots not covered by an outstanding offer.
    #[must_use]
    pub fn unheld_free_slots(&self) -> u32 {
        let held = u32::try_from(self.queue.offered_count()).unwrap_or(u32::MAX);
        self.ledger.free_slots().saturating_sub(held)
    }

    /// Whether a newcomer may take a slot without queueing: an unheld slot is
    /// free and nobody is waiting for it.
    #[must_use]
    pub fn accepts_direct_booking(&self) -> bool {
        !self.closed && self.unheld_free_slots() > 0 && self.queue.active_count() == 0
    }

    /// Whether the subject holds a booking made through the engine.
    #[must_use]
    pub fn has_booking(&self, subject_id: &str) -> bool {
        self.bookings.iter().any(|b| b.subject_id == subject_id)
    }

    /// Join the waitlist.
    ///
    /// # Errors
    ///
    /// See [`JoinError`]; checks run closed, disabled, booked, queued, not-full, limit.
    pub fn join(
        &mut self,
        subject_id: &str,
        prefs: JoinPreferences,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<WaitlistEntry, JoinError> {
        if self.closed {
            return Err(JoinError::SessionClosed);
        }
        if !self.policy.waitlist_enabled {
            return Err(JoinError::WaitlistDisabled);
        }
        if self.has_booking(subject_id) {
            return Err(JoinError::AlreadyBooked);
        }
        if self.queue.pending_for(subject_id).is_some() {
            return Err(JoinError::AlreadyQueued);
        }
        if self.accepts_direct_booking() {
            return Err(JoinError::SessionNotFull);
        }
        let entry = self
            .queue
            .enqueue(subject_id, prefs, self.policy.waitlist_limit, now_ms)?;
        fx.record("join", subject_id, Some(entry.id));
        if entry.notify_on_join {
            fx.notify(
                &self.id,
                subject_id,
                NotificationEvent::Joined {
                    entry_id: entry.id,
                    position: entry.position.unwrap_or_default(),
                },
            );
        }
        Ok(entry)
    }

    /// Leave the waitlist. Leaving while holding an offer declines it.
    ///
    /// Returns the entry in its terminal state.
    ///
    /// # Errors
    ///
    /// [`LeaveError::NotQueued`] if the subject has no pending entry.
    pub fn leave(
        &mut self,
        subject_id: &str,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<WaitlistEntry, LeaveError> {
        match self.queue.dequeue(subject_id)? {
            Dequeued::Cancelled { entry, moves } => {
                fx.record("leave", subject_id, Some(entry.id));
                fx.moved(&self.id, moves);
                Ok(entry)
            }
            Dequeued::Offered(entry_id) => {
                self.decline_offer(entry_id, now_ms, fx)
                    .map_err(|_| LeaveError::NotQueued)?;
                self.queue
                    .find(entry_id)
                    .cloned()
                    .ok_or(LeaveError::NotQueued)
            }
        }
    }

    /// Book directly, bypassing the waitlist.
    ///
    /// # Errors
    ///
    /// [`BookingError::NoSlotAvailable`] unless an unheld slot is free and the
    /// queue is empty.
    pub fn book(
        &mut self,
        subject_id: &str,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Booking, BookingError> {
        if self.closed {
            return Err(BookingError::SessionClosed);
        }
        if self.has_booking(subject_id) {
            return Err(BookingError::AlreadyBooked);
        }
        if self.queue.pending_for(subject_id).is_some() {
            return Err(BookingError::OnWaitlist);
        }
        if !self.accepts_direct_booking() {
            return Err(BookingError::NoSlotAvailable);
        }
        let token = self.ledger.reserve_slot(&self.id)?;
        let booking = Booking {
            session_id: self.id.clone(),
            subject_id: subject_id.to_owned(),
            entry_id: None,
            token,
            confirmed_at_ms: now_ms,
        };
        self.bookings.push(booking.clone());
        fx.record("book", subject_id, None);
        Ok(booking)
    }

    /// Cancel a subject's booking, release its slot, and consider promotion.
    ///
    /// # Errors
    ///
    /// [`BookingError::NotBooked`] if the subject holds no booking.
    pub fn cancel_booking(
        &mut self,
        subject_id: &str,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Booking, BookingError> {
        let idx = self
            .bookings
            .iter()
            .position(|b| b.subject_id == subject_id)
            .ok_or(BookingError::NotBooked)?;
        self.ledger.release_slot()?;
        let booking = self.bookings.remove(idx);
        fx.record("cancel", subject_id, booking.entry_id);
        fx.notify(&self.id, subject_id, NotificationEvent::BookingCancelled);
        self.on_capacity_freed(now_ms, fx);
        Ok(booking)
    }

    /// Release a slot whose booking lives outside the engine.
    ///
    /// # Errors
    ///
    /// [`CapacityError::NothingToRelease`] when no slot is confirmed,
    /// [`CapacityError::NoUntrackedSlot`] when every confirmed slot backs an
    /// engine booking.
    pub fn release_slot(&mut self) -> Result<(), CapacityError> {
        let confirmed = self.ledger.confirmed();
        if confirmed > 0 && confirmed as usize <= self.bookings.len() {
            return Err(CapacityError::NoUntrackedSlot);
        }
        self.ledger.release_slot()
    }

    /// React to a freed slot: offer it onwards when auto-promotion is on.
    pub fn on_capacity_freed(&mut self, now_ms: u128, fx: &mut Effects) -> Vec<WaitlistEntry> {
        if !self.policy.auto_promote {
            tracing::debug!(session_id = %self.id, "auto-promote off; slot left for admin");
            return Vec::new();
        }
        self.fill_free_slots(now_ms, fx)
    }

    /// Change capacity, then treat any new room as freed capacity.
    ///
    /// # Errors
    ///
    /// [`CapacityError::BelowConfirmed`] when shrinking below confirmed bookings,
    /// [`CapacityError::OffersOutstanding`] when shrinking into offered slots.
    pub fn set_capacity(
        &mut self,
        capacity: u32,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Vec<WaitlistEntry>, CapacityError> {
        let held = u32::try_from(self.queue.offered_count()).unwrap_or(u32::MAX);
        let committed = self.ledger.confirmed().saturating_add(held);
        if capacity >= self.ledger.confirmed() && capacity < committed {
            return Err(CapacityError::OffersOutstanding {
                committed,
                requested: capacity,
            });
        }
        self.ledger.set_capacity(capacity)?;
        Ok(self.on_capacity_freed(now_ms, fx))
    }

    /// Replace the waitlist policy. Outstanding offers keep their deadlines.
    pub fn set_policy(&mut self, policy: SessionPolicy) {
        self.policy = policy;
    }

    /// Close the session to new joins, bookings, and offers.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Check every structural invariant; used by tests and debug builds.
    ///
    /// # Errors
    ///
    /// Describes the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.ledger.confirmed() > self.ledger.capacity() {
            return Err(format!(
                "confirmed {} exceeds capacity {}",
                self.ledger.confirmed(),
                self.ledger.capacity()
            ));
        }
        let positions: Vec<u32> = self.queue.active().filter_map(|e| e.position).collect();
        let dense: Vec<u32> = (1..).take(self.queue.active_count()).collect();
        if positions != dense {
            return Err(format!("active positions not dense: {positions:?}"));
        }
        if self
            .queue
            .entries()
            .iter()
            .any(|e| e.status != EntryStatus::Active && e.position.is_some())
        {
            return Err("non-active entry carries a position".into());
        }
        let mut pending: Vec<&str> = self
            .queue
            .entries()
            .iter()
            .filter(|e| e.status.is_pending())
            .map(|e| e.subject_id.as_str())
            .collect();
        pending.sort_unstable();
        if pending.windows(2).any(|w| w[0] == w[1]) {
            return Err("subject holds two pending entries".into());
        }
        if pending.iter().any(|s| self.has_booking(s)) {
            return Err("booked subject is still queued".into());
        }
        let offered = u32::try_from(self.queue.offered_count()).unwrap_or(u32::MAX);
        if offered > self.ledger.free_slots() {
            return Err(format!(
                "{offered} offers outstanding for {} free slots",
                self.ledger.free_slots()
            ));
        }
        if self.bookings.len() > self.ledger.confirmed() as usize {
            return Err("more bookings than confirmed slots".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_session(policy: SessionPolicy) -> SessionState {
        SessionState::new("s1", 2, 2, policy).unwrap()
    }

    #[test]
    fn test_status_derived_from_ledger() {
        let mut s = full_session(SessionPolicy::default());
        assert_eq!(s.status(), SessionStatus::Full);
        s.release_slot().unwrap();
        assert_eq!(s.status(), SessionStatus::Open);
        s.close();
        assert_eq!(s.status(), SessionStatus::Closed);
    }

    #[test]
    fn test_join_rejects_when_not_full() {
        let mut s = SessionState::new("s1", 2, 1, SessionPolicy::default()).unwrap();
        let mut fx = Effects::default();
        let err = s
            .join("a", JoinPreferences::default(), 0, &mut fx)
            .unwrap_err();
        assert_eq!(err, JoinError::SessionNotFull);
    }

    #[test]
    fn test_join_disabled_and_closed() {
        let mut s = full_session(SessionPolicy {
            waitlist_enabled: false,
            ..SessionPolicy::default()
        });
        let mut fx = Effects::default();
        assert_eq!(
            s.join("a", JoinPreferences::default(), 0, &mut fx),
            Err(JoinError::WaitlistDisabled)
        );
        let mut s = full_session(SessionPolicy::default());
        s.close();
        assert_eq!(
            s.join("a", JoinPreferences::default(), 0, &mut fx),
            Err(JoinError::SessionClosed)
        );
    }

    #[test]
    fn test_join_notifies_only_when_asked() {
        let mut s = full_session(SessionPolicy::default());
        let mut fx = Effects::default();
        s.join("a", JoinPreferences::default(), 0, &mut fx).unwrap();
        assert!(fx.notifications.is_empty());
        s.join(
            "b",
            JoinPreferences {
                notify_on_join: true,
                notify_on_position_change: false,
            },
            0,
            &mut fx,
        )
        .unwrap();
        assert!(matches!(
            fx.notifications[0].event,
            NotificationEvent::Joined { position: 2, .. }
        ));
        assert_eq!(fx.transitions.len(), 2);
    }

    #[test]
    fn test_book_and_cancel_roundtrip() {
        let mut s = SessionState::new("s1", 1, 0, SessionPolicy::default()).unwrap();
        let mut fx = Effects::default();
        s.book("a", 0, &mut fx).unwrap();
        assert_eq!(s.book("a", 0, &mut fx), Err(BookingError::AlreadyBooked));
        assert_eq!(s.book("b", 0, &mut fx), Err(BookingError::NoSlotAvailable));
        s.join("b", JoinPreferences::default(), 1, &mut fx).unwrap();
        assert_eq!(
            s.join("a", JoinPreferences::default(), 1, &mut fx),
            Err(JoinError::AlreadyBooked)
        );
        s.cancel_booking("a", 2, &mut fx).unwrap();
        assert_eq!(
            s.queue().pending_for("b").unwrap().status,
            EntryStatus::Offered
        );
        assert_eq!(s.cancel_booking("a", 3, &mut fx), Err(BookingError::NotBooked));
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_direct_booking_cannot_take_held_slot() {
        let mut s = SessionState::new("s1", 1, 1, SessionPolicy::default()).unwrap();
        let mut fx = Effects::default();
        s.join("a", JoinPreferences::default(), 0, &mut fx).unwrap();
        s.release_slot().unwrap();
        s.on_capacity_freed(1, &mut fx);
        assert_eq!(s.unheld_free_slots(), 0);
        assert_eq!(s.book("z", 2, &mut fx), Err(BookingError::NoSlotAvailable));
        assert_eq!(
            s.join("z", JoinPreferences::default(), 2, &mut fx).map(|e| e.position),
            Ok(Some(1))
        );
    }

    #[test]
    fn test_set_capacity_refuses_shrink_below_confirmed() {
        let mut s = full_session(SessionPolicy::default());
        let mut fx = Effects::default();
        assert!(matches!(
            s.set_capacity(1, 0, &mut fx),
            Err(CapacityError::BelowConfirmed { .. })
        ));
    }

    #[test]
    fn test_offer_holder_cannot_book_around_offer() {
        let mut s = SessionState::new("s1", 1, 1, SessionPolicy::default()).unwrap();
        let mut fx = Effects::default();
        s.join("a", JoinPreferences::default(), 0, &mut fx).unwrap();
        s.release_slot().unwrap();
        s.on_capacity_freed(1, &mut fx);
        s.set_capacity(2, 2, &mut fx).unwrap();
        assert!(s.accepts_direct_booking());
        assert_eq!(s.book("a", 3, &mut fx), Err(BookingError::OnWaitlist));
        assert!(s.book("z", 3, &mut fx).is_ok());
    }

    #[test]
    fn test_set_capacity_keeps_offered_slots() {
        let mut s = SessionState::new("s1", 2, 2, SessionPolicy::default()).unwrap();
        let mut fx = Effects::default();
        s.join("a", JoinPreferences::default(), 0, &mut fx).unwrap();
        s.release_slot().unwrap();
        assert_eq!(s.on_capacity_freed(1, &mut fx).len(), 1);
        assert_eq!(
            s.set_capacity(1, 2, &mut fx),
            Err(CapacityError::OffersOutstanding {
                committed: 2,
                requested: 1
            })
        );
        assert_eq!(s.ledger().capacity(), 2);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_release_slot_refuses_tracked_bookings() {
        let mut s = SessionState::new("s1", 1, 0, SessionPolicy::default()).unwrap();
        let mut fx = Effects::default();
        s.book("a", 0, &mut fx).unwrap();
        assert_eq!(s.release_slot(), Err(CapacityError::NoUntrackedSlot));
        assert_eq!(s.ledger().confirmed(), 1);
        assert_eq!(s.book("b", 1, &mut fx), Err(BookingError::NoSlotAvailable));
        s.cancel_booking("a", 2, &mut fx).unwrap();
        s.check_invariants().unwrap();
    }
}
