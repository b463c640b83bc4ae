//! Offer state machine: `Active → Offered → {Promoted | Declined | Expired}`.
//!
//! An offer does not reserve a ledger slot. It holds a free slot only in the sense
//! that [`SessionState::unheld_free_slots`] counts it, so no second offer or direct
//! booking can target the same slot. Capacity is committed at acceptance.

use crate::core::{
    AcceptError, Booking, Effects, EntryStatus, NotificationEvent, OfferError, SessionState,
    WaitlistEntry,
};
use crate::util::clock::offer_deadline_ms;
use crate::util::serde::EntryId;

impl SessionState {
    /// Offer one unheld free slot to the head of the queue.
    ///
    /// Returns `Ok(None)` when there is no unheld slot, no active entry, or the
    /// session is closed.
    ///
    /// # Errors
    ///
    /// Only on an internally inconsistent queue.
    pub fn make_offer(
        &mut self,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Option<WaitlistEntry>, OfferError> {
        if self.closed || self.unheld_free_slots() == 0 {
            return Ok(None);
        }
        let Some(next) = self.queue.peek_next_active() else {
            tracing::debug!(session_id = %self.id, "no active entry to offer");
            return Ok(None);
        };
        let entry_id = next.id;
        let moves = self.queue.transition(entry_id, EntryStatus::Offered)?;
        let deadline = offer_deadline_ms(now_ms, self.policy.offer_window_minutes);
        self.queue.set_offer_deadline(entry_id, deadline);
        let entry = self
            .queue
            .find(entry_id)
            .cloned()
            .ok_or(OfferError::EntryNotFound(entry_id))?;

        tracing::info!(
            session_id = %self.id,
            subject_id = %entry.subject_id,
            %entry_id,
            expires_at_ms = %deadline,
            "offer made"
        );
        fx.record("offer", &entry.subject_id, Some(entry_id));
        fx.notify(
            &self.id,
            &entry.subject_id,
            NotificationEvent::OfferMade {
                entry_id,
                expires_at_ms: deadline,
            },
        );
        fx.moved(&self.id, moves);
        Ok(Some(entry))
    }

    /// Offer every unheld free slot, head of queue first.
    pub fn fill_free_slots(&mut self, now_ms: u128, fx: &mut Effects) -> Vec<WaitlistEntry> {
        let mut offered = Vec::new();
        loop {
            match self.make_offer(now_ms, fx) {
                Ok(Some(entry)) => offered.push(entry),
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(session_id = %self.id, error = %e, "promotion aborted");
                    break;
                }
            }
        }
        offered
    }

    /// Convert an outstanding offer into a confirmed booking.
    ///
    /// The deadline is checked here, not only by the reaper: an offer past its
    /// deadline is expired on the spot (and the slot re-offered when
    /// auto-promotion is on) before `OfferExpired` is returned.
    ///
    /// # Errors
    ///
    /// See [`AcceptError`]. On every error except `OfferExpired` the entry is unchanged.
    pub fn accept_offer(
        &mut self,
        entry_id: EntryId,
        payment_confirmed: bool,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Booking, AcceptError> {
        let entry = self.queue.find(entry_id).ok_or(AcceptError::OfferNotFound)?;
        match entry.status {
            EntryStatus::Offered => {}
            EntryStatus::Expired => return Err(AcceptError::OfferExpired),
            _ => return Err(AcceptError::OfferNotFound),
        }
        let deadline = entry.offer_expires_at_ms;
        let subject_id = entry.subject_id.clone();
        if deadline.is_none_or(|d| now_ms >= d) {
            tracing::info!(session_id = %self.id, %entry_id, "late acceptance refused");
            self.expire_offer(entry_id, now_ms, fx)
                .map_err(|_| AcceptError::OfferNotFound)?;
            return Err(AcceptError::OfferExpired);
        }
        if !payment_confirmed {
            return Err(AcceptError::PaymentNotConfirmed);
        }

        let token = match self.ledger.reserve_slot(&self.id) {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(
                    session_id = %self.id,
                    %entry_id,
                    error = %e,
                    confirmed = self.ledger.confirmed(),
                    capacity = self.ledger.capacity(),
                    "capacity race detected: offered slot already consumed"
                );
                return Err(AcceptError::CapacityRaceDetected);
            }
        };
        self.queue
            .transition(entry_id, EntryStatus::Promoted)
            .map_err(|_| AcceptError::OfferNotFound)?;

        let booking = Booking {
            session_id: self.id.clone(),
            subject_id: subject_id.clone(),
            entry_id: Some(entry_id),
            token,
            confirmed_at_ms: now_ms,
        };
        self.bookings.push(booking.clone());
        tracing::info!(session_id = %self.id, %subject_id, %entry_id, "offer accepted");
        fx.record("promote", &subject_id, Some(entry_id));
        fx.notify(
            &self.id,
            &subject_id,
            NotificationEvent::Promoted {
                entry_id: Some(entry_id),
            },
        );
        Ok(booking)
    }

    /// The holder releases the offer. Returns entries offered in its place.
    ///
    /// # Errors
    ///
    /// [`OfferError`] if the entry is unknown or not offered.
    pub fn decline_offer(
        &mut self,
        entry_id: EntryId,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Vec<WaitlistEntry>, OfferError> {
        self.close_offer(entry_id, EntryStatus::Declined, now_ms, fx)
    }

    /// The offer window closed. Returns entries offered in its place.
    ///
    /// # Errors
    ///
    /// [`OfferError`] if the entry is unknown or not offered.
    pub fn expire_offer(
        &mut self,
        entry_id: EntryId,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Vec<WaitlistEntry>, OfferError> {
        self.close_offer(entry_id, EntryStatus::Expired, now_ms, fx)
    }

    /// Expire every offer due at `now_ms`. Returns the expired entry ids.
    pub fn expire_due(&mut self, now_ms: u128, fx: &mut Effects) -> Vec<EntryId> {
        let due = self.queue.overdue_offers(now_ms);
        let mut expired = Vec::with_capacity(due.len());
        for entry_id in due {
            match self.expire_offer(entry_id, now_ms, fx) {
                Ok(_) => expired.push(entry_id),
                Err(e) => tracing::warn!(session_id = %self.id, %entry_id, error = %e, "expiry skipped"),
            }
        }
        expired
    }

    fn close_offer(
        &mut self,
        entry_id: EntryId,
        outcome: EntryStatus,
        now_ms: u128,
        fx: &mut Effects,
    ) -> Result<Vec<WaitlistEntry>, OfferError> {
        let entry = self
            .queue
            .find(entry_id)
            .ok_or(OfferError::EntryNotFound(entry_id))?;
        if entry.status != EntryStatus::Offered {
            return Err(OfferError::NotOffered {
                entry_id,
                status: entry.status,
            });
        }
        let subject_id = entry.subject_id.clone();
        self.queue.transition(entry_id, outcome)?;

        let (action, event) = if outcome == EntryStatus::Expired {
            ("expire", NotificationEvent::OfferExpired { entry_id })
        } else {
            ("decline", NotificationEvent::OfferDeclined { entry_id })
        };
        tracing::info!(session_id = %self.id, %subject_id, %entry_id, action, "offer closed");
        fx.record(action, &subject_id, Some(entry_id));
        fx.notify(&self.id, &subject_id, event);

        Ok(self.on_capacity_freed(now_ms, fx))
    }
}
