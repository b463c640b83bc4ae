//! Serializable identifier types shared across the engine.

/// Identifier of a bookable session. Owned by the surrounding booking product.
pub type SessionId = String;

/// Identifier of the player or beneficiary that books or queues.
pub type SubjectId = String;

/// Identifier of a waitlist entry.
pub type EntryId = uuid::Uuid;

/// Allocate a fresh waitlist entry identifier.
#[must_use]
pub fn new_entry_id() -> EntryId {
    uuid::Uuid::new_v4()
}
