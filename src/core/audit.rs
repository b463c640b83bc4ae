//! Audit trail of waitlist and booking transitions.
//!
//! Terminal entries stay on the session for history; the sink receives the
//! ordered stream of transitions the gateway published across all sessions.

use std::collections::VecDeque;

use serde::Serialize;

use crate::util::clock::now_ms;
use crate::util::serde::{EntryId, SessionId, SubjectId};

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Unique id, `{session}-{action}-{uuid}`.
    pub event_id: String,
    /// Session the transition happened in.
    pub session_id: SessionId,
    /// Subject concerned.
    pub subject_id: SubjectId,
    /// Waitlist entry, when the change went through the queue.
    pub entry_id: Option<EntryId>,
    /// One of `join`, `leave`, `offer`, `promote`, `decline`, `expire`, `book`, `cancel`.
    pub action: String,
    /// Wall-clock time the event was built.
    pub created_at_ms: u128,
    /// Free-form context.
    pub payload: Option<String>,
}

/// Receiver of audit events. Called after the session lock is released.
pub trait AuditSink: Send {
    /// Store one event.
    fn record(&mut self, event: AuditEvent);
}

/// Ring buffer keeping the most recent `max_events` events.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Sink retaining at most `max_events`; zero disables retention.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retained events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// History of one waitlist entry, oldest first.
    #[must_use]
    pub fn for_entry(&self, entry_id: EntryId) -> Vec<AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.entry_id == Some(entry_id))
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() == self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Sink writing each event as a structured `tracing` record on the
/// `prometheus_waitlist::audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            target: "prometheus_waitlist::audit",
            event_id = %event.event_id,
            session_id = %event.session_id,
            subject_id = %event.subject_id,
            entry_id = ?event.entry_id,
            action = %event.action,
            "audit"
        );
    }
}

/// Build an event stamped with the current time.
pub fn build_audit_event(
    session_id: impl Into<SessionId>,
    subject_id: impl Into<SubjectId>,
    entry_id: Option<EntryId>,
    action: impl Into<String>,
    payload: Option<String>,
) -> AuditEvent {
    let session_id = session_id.into();
    let action = action.into();
    AuditEvent {
        event_id: format!("{session_id}-{action}-{}", uuid::Uuid::new_v4()),
        session_id,
        subject_id: subject_id.into(),
        entry_id,
        action,
        created_at_ms: now_ms(),
        payload,
    }
}
