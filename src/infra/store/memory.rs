//! In-memory session store with entry and deadline indexes.

use std::collections::HashMap;

use crate::core::{GatewayError, SessionState, SessionStore};
use crate::util::serde::{EntryId, SessionId};

/// Session store held in process memory.
///
/// Keeps two secondary indexes, refreshed on every save: entry id to owning
/// session (for accept/decline by entry), and each session's earliest
/// outstanding offer deadline (for the reaper scan).
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: HashMap<SessionId, SessionState>,
    entry_index: HashMap<EntryId, SessionId>,
    next_deadline: HashMap<SessionId, u128>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn reindex(&mut self, state: &SessionState) {
        for entry in state.queue().entries() {
            self.entry_index
                .entry(entry.id)
                .or_insert_with(|| state.id().to_owned());
        }
        match state.queue().next_offer_deadline() {
            Some(deadline) => {
                self.next_deadline.insert(state.id().to_owned(), deadline);
            }
            None => {
                self.next_deadline.remove(state.id());
            }
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn insert(&mut self, state: SessionState) -> Result<(), GatewayError> {
        if self.sessions.contains_key(state.id()) {
            return Err(GatewayError::SessionExists(state.id().to_owned()));
        }
        self.reindex(&state);
        self.sessions.insert(state.id().to_owned(), state);
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<SessionState>, GatewayError> {
        Ok(self.sessions.get(session_id).cloned())
    }

    fn save(&mut self, state: SessionState) -> Result<(), GatewayError> {
        if !self.sessions.contains_key(state.id()) {
            return Err(GatewayError::SessionNotFound(state.id().to_owned()));
        }
        self.reindex(&state);
        self.sessions.insert(state.id().to_owned(), state);
        Ok(())
    }

    fn locate_entry(&self, entry_id: EntryId) -> Result<Option<SessionId>, GatewayError> {
        Ok(self.entry_index.get(&entry_id).cloned())
    }

    fn sessions_with_due_offers(&self, now_ms: u128) -> Result<Vec<SessionId>, GatewayError> {
        let mut due: Vec<SessionId> = self
            .next_deadline
            .iter()
            .filter(|(_, deadline)| **deadline <= now_ms)
            .map(|(id, _)| id.clone())
            .collect();
        due.sort();
        Ok(due)
    }

    fn session_ids(&self) -> Result<Vec<SessionId>, GatewayError> {
        let mut ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
