//! Error types for allocation operations.
//!
//! Each operation family has its own enum so callers can match on exactly the
//! outcomes that operation can produce. Lock-table and store failures are shared
//! through [`GatewayError`] and convert into every family.

use thiserror::Error;

use crate::core::waitlist::EntryStatus;
use crate::util::serde::{EntryId, SessionId};

/// Failures raised by the gateway itself, independent of the operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No session with this id is registered.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    /// A session with this id is already registered.
    #[error("session already registered: {0}")]
    SessionExists(SessionId),
    /// Backend-specific failure with context.
    #[error("store error: {0}")]
    Store(String),
}

/// Capacity ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// Every slot is already confirmed.
    #[error("capacity exceeded")]
    CapacityExceeded,
    /// A release was requested while no slot is confirmed.
    #[error("no confirmed slot to release")]
    NothingToRelease,
    /// Every confirmed slot backs a booking the engine tracks; cancel that booking instead.
    #[error("every confirmed slot belongs to a tracked booking")]
    NoUntrackedSlot,
    /// Capacity cannot shrink below the number of confirmed bookings.
    #[error("capacity {requested} is below confirmed count {confirmed}")]
    BelowConfirmed {
        /// Confirmed bookings at the time of the request.
        confirmed: u32,
        /// Capacity that was asked for.
        requested: u32,
    },
    /// Capacity cannot shrink into slots held by outstanding offers.
    #[error("capacity {requested} would revoke outstanding offers ({committed} slots committed)")]
    OffersOutstanding {
        /// Confirmed bookings plus outstanding offers.
        committed: u32,
        /// Capacity that was asked for.
        requested: u32,
    },
    /// Shared gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Reasons a subject cannot join a session's waitlist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The subject already has an active or offered entry.
    #[error("subject is already queued for this session")]
    AlreadyQueued,
    /// The subject already holds a confirmed booking.
    #[error("subject already holds a booking for this session")]
    AlreadyBooked,
    /// The waitlist limit has been reached.
    #[error("waitlist full (limit {limit})")]
    WaitlistFull {
        /// Configured limit on active entries.
        limit: u32,
    },
    /// A slot is free and unheld; the subject should book directly.
    #[error("session is not full")]
    SessionNotFull,
    /// The session does not accept waitlist entries.
    #[error("waitlist disabled for this session")]
    WaitlistDisabled,
    /// The session has been closed by an admin.
    #[error("session closed")]
    SessionClosed,
    /// Shared gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Reasons a subject cannot leave a waitlist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveError {
    /// The subject has no active or offered entry.
    #[error("subject is not queued for this session")]
    NotQueued,
    /// Shared gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Failures of the offer state machine outside of acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfferError {
    /// No entry with this id exists.
    #[error("entry not found: {0}")]
    EntryNotFound(EntryId),
    /// The entry is not currently holding an offer.
    #[error("entry {entry_id} is {status:?}, not offered")]
    NotOffered {
        /// Entry that was targeted.
        entry_id: EntryId,
        /// Status observed under the session lock.
        status: EntryStatus,
    },
    /// Shared gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Reasons an offer cannot be converted into a booking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceptError {
    /// The offer window closed before acceptance.
    #[error("offer expired")]
    OfferExpired,
    /// No outstanding offer with this id.
    #[error("offer not found")]
    OfferNotFound,
    /// The caller did not confirm payment.
    #[error("payment not confirmed")]
    PaymentNotConfirmed,
    /// The ledger refused a slot that the offer should have been holding.
    #[error("capacity race detected")]
    CapacityRaceDetected,
    /// Shared gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Booking path failures (direct booking and cancellation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// Every free slot is confirmed or held by an outstanding offer.
    #[error("no unheld slot available")]
    NoSlotAvailable,
    /// The subject already holds a booking.
    #[error("subject already holds a booking for this session")]
    AlreadyBooked,
    /// The subject is queued or holds an offer; an offer is taken by accepting it.
    #[error("subject already holds a waitlist entry for this session")]
    OnWaitlist,
    /// The subject holds no booking to cancel.
    #[error("subject holds no booking for this session")]
    NotBooked,
    /// The session has been closed by an admin.
    #[error("session closed")]
    SessionClosed,
    /// Ledger refused the mutation.
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    /// Shared gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
