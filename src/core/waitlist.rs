//! Per-session waitlist queue with dense active positions.
//!
//! Entries are kept in enqueue order for their whole life. Only `Active` entries
//! carry a position; positions are always `1..=N` in enqueue order. Offered and
//! terminal entries drop out of the numbering but keep `queue_order` for audit.

use serde::{Deserialize, Serialize};

use crate::core::{JoinError, LeaveError, OfferError};
use crate::util::serde::{new_entry_id, EntryId, SessionId, SubjectId};

/// Lifecycle status of a waitlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Queued and numbered.
    Active,
    /// Holding a time-boxed offer for a freed slot.
    Offered,
    /// Offer accepted; the subject holds a booking.
    Promoted,
    /// Offer released by the holder.
    Declined,
    /// Offer window closed before acceptance.
    Expired,
    /// Left the queue before receiving an offer.
    Cancelled,
}

impl EntryStatus {
    /// Terminal entries never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_pending()
    }

    /// `Active` or `Offered`.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Active | Self::Offered)
    }

    /// Allowed edges of the entry state machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Offered | Self::Cancelled)
                | (Self::Offered, Self::Promoted | Self::Declined | Self::Expired)
        )
    }
}

/// Notification preferences captured at join time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPreferences {
    /// Send a confirmation when the entry is created.
    pub notify_on_join: bool,
    /// Send an update whenever the entry's position moves.
    pub notify_on_position_change: bool,
}

/// A subject's place in a session's waitlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// Session the entry queues for.
    pub session_id: SessionId,
    /// Player or beneficiary.
    pub subject_id: SubjectId,
    /// 1-based position while `Active`, `None` otherwise.
    pub position: Option<u32>,
    /// Monotonic enqueue sequence within the session.
    pub queue_order: u64,
    /// Current status.
    pub status: EntryStatus,
    /// Offer deadline while `Offered` (and retained afterwards).
    pub offer_expires_at_ms: Option<u128>,
    /// See [`JoinPreferences::notify_on_join`].
    pub notify_on_join: bool,
    /// See [`JoinPreferences::notify_on_position_change`].
    pub notify_on_position_change: bool,
    /// Creation time in milliseconds since epoch.
    pub created_at_ms: u128,
}

/// A position move produced by renumbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionChange {
    /// Entry that moved.
    pub entry_id: EntryId,
    /// Owner of the entry.
    pub subject_id: SubjectId,
    /// Previous position.
    pub from: u32,
    /// New position.
    pub to: u32,
    /// Whether the owner asked to hear about moves.
    pub notify: bool,
}

/// Result of removing a subject from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dequeued {
    /// An active entry was cancelled and the queue closed the gap.
    Cancelled {
        /// The cancelled entry.
        entry: WaitlistEntry,
        /// Entries that moved up.
        moves: Vec<PositionChange>,
    },
    /// The subject holds an offer; the caller must route this through the
    /// offer state machine as a decline.
    Offered(EntryId),
}

/// Ordered collection of entries for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistQueue {
    session_id: SessionId,
    entries: Vec<WaitlistEntry>,
    next_order: u64,
}

impl WaitlistQueue {
    /// Create an empty queue for a session.
    #[must_use]
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            entries: Vec::new(),
            next_order: 0,
        }
    }

    /// All entries, terminal ones included, in enqueue order.
    #[must_use]
    pub fn entries(&self) -> &[WaitlistEntry] {
        &self.entries
    }

    /// Entries currently `Active`, by position.
    pub fn active(&self) -> impl Iterator<Item = &WaitlistEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Active)
    }

    /// Number of `Active` entries.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Number of `Offered` entries. Each one holds a freed slot.
    #[must_use]
    pub fn offered_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Offered)
            .count()
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn find(&self, entry_id: EntryId) -> Option<&WaitlistEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// The subject's active or offered entry, if any.
    #[must_use]
    pub fn pending_for(&self, subject_id: &str) -> Option<&WaitlistEntry> {
        self.entries
            .iter()
            .find(|e| e.subject_id == subject_id && e.status.is_pending())
    }

    /// Append a subject to the end of the queue.
    ///
    /// `limit` caps the number of active entries. The booking check is the
    /// session's concern and happens before this is called.
    ///
    /// # Errors
    ///
    /// [`JoinError::AlreadyQueued`] if the subject has a pending entry,
    /// [`JoinError::WaitlistFull`] if the limit is reached.
    pub fn enqueue(
        &mut self,
        subject_id: &str,
        prefs: JoinPreferences,
        limit: Option<u32>,
        now_ms: u128,
    ) -> Result<WaitlistEntry, JoinError> {
        if self.pending_for(subject_id).is_some() {
            return Err(JoinError::AlreadyQueued);
        }
        if let Some(limit) = limit {
            if self.active_count() >= limit as usize {
                return Err(JoinError::WaitlistFull { limit });
            }
        }
        let position = self.active().filter_map(|e| e.position).max().unwrap_or(0) + 1;
        self.next_order += 1;
        let entry = WaitlistEntry {
            id: new_entry_id(),
            session_id: self.session_id.clone(),
            subject_id: subject_id.to_owned(),
            position: Some(position),
            queue_order: self.next_order,
            status: EntryStatus::Active,
            offer_expires_at_ms: None,
            notify_on_join: prefs.notify_on_join,
            notify_on_position_change: prefs.notify_on_position_change,
            created_at_ms: now_ms,
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Remove a subject from the queue.
    ///
    /// # Errors
    ///
    /// [`LeaveError::NotQueued`] if the subject has no pending entry.
    pub fn dequeue(&mut self, subject_id: &str) -> Result<Dequeued, LeaveError> {
        let entry = self.pending_for(subject_id).ok_or(LeaveError::NotQueued)?;
        let entry_id = entry.id;
        if entry.status == EntryStatus::Offered {
            return Ok(Dequeued::Offered(entry_id));
        }
        let moves = self
            .transition(entry_id, EntryStatus::Cancelled)
            .map_err(|_| LeaveError::NotQueued)?;
        let entry = self.find(entry_id).cloned().ok_or(LeaveError::NotQueued)?;
        Ok(Dequeued::Cancelled { entry, moves })
    }

    /// Lowest-position active entry.
    #[must_use]
    pub fn peek_next_active(&self) -> Option<&WaitlistEntry> {
        self.active().min_by_key(|e| e.position)
    }

    /// Reassign dense positions to active entries in enqueue order.
    pub fn renumber(&mut self) -> Vec<PositionChange> {
        let mut moves = Vec::new();
        let mut next = 0u32;
        for entry in &mut self.entries {
            if entry.status != EntryStatus::Active {
                entry.position = None;
                continue;
            }
            next += 1;
            match entry.position {
                Some(old) if old == next => {}
                Some(old) => {
                    moves.push(PositionChange {
                        entry_id: entry.id,
                        subject_id: entry.subject_id.clone(),
                        from: old,
                        to: next,
                        notify: entry.notify_on_position_change,
                    });
                    entry.position = Some(next);
                }
                None => entry.position = Some(next),
            }
        }
        moves
    }

    /// Move an entry along one edge of the state machine.
    ///
    /// Leaving `Active` renumbers the queue; the resulting moves are returned.
    /// Offer deadlines are set separately through [`Self::set_offer_deadline`].
    ///
    /// # Errors
    ///
    /// [`OfferError::EntryNotFound`] for unknown ids and
    /// [`OfferError::NotOffered`] for edges the state machine does not allow.
    pub fn transition(
        &mut self,
        entry_id: EntryId,
        next: EntryStatus,
    ) -> Result<Vec<PositionChange>, OfferError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or(OfferError::EntryNotFound(entry_id))?;
        if !entry.status.can_transition_to(next) {
            return Err(OfferError::NotOffered {
                entry_id,
                status: entry.status,
            });
        }
        let was_active = entry.status == EntryStatus::Active;
        entry.status = next;
        if was_active {
            entry.position = None;
            Ok(self.renumber())
        } else {
            Ok(Vec::new())
        }
    }

    pub(crate) fn set_offer_deadline(&mut self, entry_id: EntryId, deadline_ms: u128) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == entry_id) {
            entry.offer_expires_at_ms = Some(deadline_ms);
        }
    }

    /// Offered entries whose deadline is at or before `now_ms`, oldest offer first.
    #[must_use]
    pub fn overdue_offers(&self, now_ms: u128) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Offered)
            .filter(|e| e.offer_expires_at_ms.is_some_and(|d| d <= now_ms))
            .map(|e| e.id)
            .collect()
    }

    /// Earliest deadline among outstanding offers.
    #[must_use]
    pub fn next_offer_deadline(&self) -> Option<u128> {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Offered)
            .filter_map(|e| e.offer_expires_at_ms)
            .min()
    }
}
