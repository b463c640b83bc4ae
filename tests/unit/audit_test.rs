//! Tests for audit sink

use prometheus_waitlist::core::{build_audit_event, AuditSink, InMemoryAuditSink, TracingAuditSink};
use prometheus_waitlist::util::new_entry_id;

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let entry_id = new_entry_id();

    sink.record(build_audit_event(
        "s1",
        "subject1",
        Some(entry_id),
        "join",
        Some("payload".to_string()),
    ));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].session_id, "s1");
    assert_eq!(events[0].subject_id, "subject1");
    assert_eq!(events[0].entry_id, Some(entry_id));
    assert_eq!(events[0].action, "join");
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event("s1", "a", None, "join", None));
    sink.record(build_audit_event("s1", "b", None, "join", None));
    sink.record(build_audit_event("s1", "c", None, "join", None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].subject_id, "b"); // First one popped
    assert_eq!(events[1].subject_id, "c");
}

#[test]
fn test_history_for_entry() {
    let mut sink = InMemoryAuditSink::new(10);
    let a = new_entry_id();
    let b = new_entry_id();
    for (entry, action) in [(a, "join"), (b, "join"), (a, "offer"), (a, "expire")] {
        sink.record(build_audit_event("s1", "x", Some(entry), action, None));
    }
    let actions: Vec<String> = sink.for_entry(a).into_iter().map(|e| e.action).collect();
    assert_eq!(actions, vec!["join", "offer", "expire"]);
}

#[test]
fn test_tracing_sink_accepts_events() {
    let mut sink = TracingAuditSink;
    sink.record(build_audit_event("s1", "a", None, "book", None));
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event("s1", "a", None, "book", None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event("s1", "subject1", None, "expire", Some("late".to_string()));

    assert!(event.event_id.starts_with("s1-expire-"));
    assert_eq!(event.session_id, "s1");
    assert_eq!(event.action, "expire");
    assert_eq!(event.payload, Some("late".to_string()));
    assert!(event.created_at_ms > 0);

    let other = build_audit_event("s1", "subject1", None, "expire", None);
    assert_ne!(event.event_id, other.event_id);
}
