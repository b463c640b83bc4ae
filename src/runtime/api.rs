//! API-facing request/response models for the booking and admin layers.
//!
//! Wire shape is the caller's concern; these are the serde models the HTTP
//! handlers map onto gateway calls.

use serde::{Deserialize, Serialize};

use crate::core::{
    AcceptError, AllocationGateway, Booking, EntryStatus, GatewayError, JoinError,
    JoinPreferences, SessionState, SessionStatus, SessionStore, WaitlistEntry,
};
use crate::util::serde::{EntryId, SessionId, SubjectId};

/// Waitlist join payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Target session.
    pub session_id: SessionId,
    /// Subject joining.
    pub subject_id: SubjectId,
    /// Confirm the join by notification.
    #[serde(default)]
    pub notify_on_join: bool,
    /// Report position moves by notification.
    #[serde(default)]
    pub notify_on_position_change: bool,
}

/// Offer acceptance payload, sent once payment has been captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRequest {
    /// Entry holding the offer.
    pub entry_id: EntryId,
    /// Whether the payment provider confirmed the charge.
    pub payment_confirmed: bool,
}

/// Waitlist entry as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryResponse {
    /// Entry identifier.
    pub entry_id: EntryId,
    /// Subject.
    pub subject_id: SubjectId,
    /// Position while active.
    pub position: Option<u32>,
    /// Current status.
    pub status: EntryStatus,
    /// Offer deadline, if an offer was made.
    pub offer_expires_at_ms: Option<u128>,
}

impl From<&WaitlistEntry> for EntryResponse {
    fn from(e: &WaitlistEntry) -> Self {
        Self {
            entry_id: e.id,
            subject_id: e.subject_id.clone(),
            position: e.position,
            status: e.status,
            offer_expires_at_ms: e.offer_expires_at_ms,
        }
    }
}

/// Admin dashboard view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: SessionId,
    /// Derived status.
    pub status: SessionStatus,
    /// Total slots.
    pub capacity: u32,
    /// Confirmed bookings.
    pub confirmed_count: u32,
    /// Free slots not held by an offer.
    pub unheld_free_slots: u32,
    /// Active and offered entries, queue order.
    pub waitlist: Vec<EntryResponse>,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(s: &SessionState) -> Self {
        Self {
            session_id: s.id().to_owned(),
            status: s.status(),
            capacity: s.ledger().capacity(),
            confirmed_count: s.ledger().confirmed(),
            unheld_free_slots: s.unheld_free_slots(),
            waitlist: s
                .queue()
                .entries()
                .iter()
                .filter(|e| e.status.is_pending())
                .map(EntryResponse::from)
                .collect(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Registered sessions.
    pub sessions: usize,
}

/// Join a waitlist from an API request.
///
/// # Errors
///
/// See [`JoinError`].
pub fn join<S: SessionStore>(
    gateway: &AllocationGateway<S>,
    req: &JoinRequest,
    now_ms: u128,
) -> Result<EntryResponse, JoinError> {
    let prefs = JoinPreferences {
        notify_on_join: req.notify_on_join,
        notify_on_position_change: req.notify_on_position_change,
    };
    let outcome = gateway.join_waitlist(&req.session_id, &req.subject_id, prefs, now_ms)?;
    Ok(EntryResponse::from(&outcome.value))
}

/// Accept an offer from an API request.
///
/// # Errors
///
/// See [`AcceptError`].
pub fn accept<S: SessionStore>(
    gateway: &AllocationGateway<S>,
    req: &AcceptRequest,
    now_ms: u128,
) -> Result<Booking, AcceptError> {
    Ok(gateway
        .accept_offer(req.entry_id, req.payment_confirmed, now_ms)?
        .value)
}

/// Snapshot a session for the admin dashboard.
///
/// # Errors
///
/// [`GatewayError::SessionNotFound`] for unknown sessions.
pub fn session_snapshot<S: SessionStore>(
    gateway: &AllocationGateway<S>,
    session_id: &str,
) -> Result<SessionSnapshot, GatewayError> {
    gateway
        .snapshot(session_id)
        .map(|s| SessionSnapshot::from(&s))
}

/// Return a health payload.
pub fn health<S: SessionStore>(gateway: &AllocationGateway<S>) -> Health {
    match gateway.session_ids() {
        Ok(ids) => Health {
            ok: true,
            sessions: ids.len(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "health check could not list sessions");
            Health {
                ok: false,
                sessions: 0,
            }
        }
    }
}
