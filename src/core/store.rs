//! Session storage abstraction.
//!
//! The gateway loads a session, mutates it under the session lock, and saves it
//! back. Backends only need per-call atomicity; ordering comes from the gateway.

use crate::core::{GatewayError, SessionState};
use crate::util::serde::{EntryId, SessionId};

/// Abstraction for session state backends.
pub trait SessionStore: Send {
    /// Register a new session.
    ///
    /// # Errors
    ///
    /// [`GatewayError::SessionExists`] if the id is taken.
    fn insert(&mut self, state: SessionState) -> Result<(), GatewayError>;

    /// Load a copy of a session, if registered.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn load(&self, session_id: &str) -> Result<Option<SessionState>, GatewayError>;

    /// Persist a session previously loaded.
    ///
    /// # Errors
    ///
    /// Backend failures, or [`GatewayError::SessionNotFound`] for unknown ids.
    fn save(&mut self, state: SessionState) -> Result<(), GatewayError>;

    /// Session owning a waitlist entry.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn locate_entry(&self, entry_id: EntryId) -> Result<Option<SessionId>, GatewayError>;

    /// Sessions with at least one offer due at or before `now_ms`.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn sessions_with_due_offers(&self, now_ms: u128) -> Result<Vec<SessionId>, GatewayError>;

    /// Every registered session id.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn session_ids(&self) -> Result<Vec<SessionId>, GatewayError>;
}
