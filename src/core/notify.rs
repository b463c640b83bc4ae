//! Notification intents and the dispatcher seam.
//!
//! The engine never delivers email or SMS. Operations return the intents they
//! produced, and the gateway hands each one to a [`Notifier`] after the session
//! lock has been released. Delivery failures are logged and dropped.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::serde::{EntryId, SessionId, SubjectId};

/// What happened to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Joined the waitlist.
    Joined {
        /// Entry created.
        entry_id: EntryId,
        /// Position at join time.
        position: u32,
    },
    /// Moved within the waitlist.
    PositionChanged {
        /// Entry that moved.
        entry_id: EntryId,
        /// Old position.
        from: u32,
        /// New position.
        to: u32,
    },
    /// A freed slot is being held for the subject.
    OfferMade {
        /// Entry holding the offer.
        entry_id: EntryId,
        /// Deadline in milliseconds since epoch.
        expires_at_ms: u128,
    },
    /// The offer window closed.
    OfferExpired {
        /// Entry whose offer expired.
        entry_id: EntryId,
    },
    /// The subject released the offer.
    OfferDeclined {
        /// Entry whose offer was declined.
        entry_id: EntryId,
    },
    /// The subject now holds a confirmed booking.
    Promoted {
        /// Entry id when the booking came from the waitlist.
        entry_id: Option<EntryId>,
    },
    /// A confirmed booking was cancelled.
    BookingCancelled,
}

/// A side-effect intent produced by an allocation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Session the event concerns.
    pub session_id: SessionId,
    /// Recipient.
    pub subject_id: SubjectId,
    /// Event payload.
    pub event: NotificationEvent,
}

/// Delivery failure reported by a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound notification dispatcher.
pub trait Notifier: Send + Sync {
    /// Hand off one notification. Must not block on delivery.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the hand-off failed. The engine logs it and moves on.
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Dispatcher that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// In-memory dispatcher for tests and local development.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything dispatched so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Notifications addressed to one subject.
    #[must_use]
    pub fn sent_to(&self, subject_id: &str) -> Vec<NotificationEvent> {
        self.sent
            .lock()
            .iter()
            .filter(|n| n.subject_id == subject_id)
            .map(|n| n.event.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// Dispatch intents, logging (not retrying) failures.
pub fn dispatch_all(notifier: &dyn Notifier, notifications: &[Notification]) {
    for n in notifications {
        if let Err(e) = notifier.notify(n) {
            tracing::warn!(
                session_id = %n.session_id,
                subject_id = %n.subject_id,
                error = %e,
                "dropping notification"
            );
        }
    }
}
