//! Tests for the API request/response models

use prometheus_waitlist::config::SessionPolicy;
use prometheus_waitlist::core::{AcceptError, AllocationGateway, EntryStatus, SessionState, SessionStatus};
use prometheus_waitlist::infra::InMemorySessionStore;
use prometheus_waitlist::runtime::api::{self, AcceptRequest, JoinRequest};

fn gateway() -> AllocationGateway<InMemorySessionStore> {
    let gw = AllocationGateway::new(InMemorySessionStore::new());
    gw.register_session(SessionState::new("s1", 1, 1, SessionPolicy::default()).unwrap())
        .unwrap();
    gw
}

fn join_request(subject: &str) -> JoinRequest {
    JoinRequest {
        session_id: "s1".into(),
        subject_id: subject.into(),
        notify_on_join: false,
        notify_on_position_change: false,
    }
}

#[test]
fn test_join_request_flags_default_off() {
    let req: JoinRequest =
        serde_json::from_str(r#"{ "session_id": "s1", "subject_id": "a" }"#).unwrap();
    assert!(!req.notify_on_join);
    assert!(!req.notify_on_position_change);
}

#[test]
fn test_join_and_accept_through_api() {
    let gw = gateway();
    let entry = api::join(&gw, &join_request("a"), 0).unwrap();
    assert_eq!(entry.position, Some(1));
    assert_eq!(entry.status, EntryStatus::Active);

    let req = AcceptRequest {
        entry_id: entry.entry_id,
        payment_confirmed: true,
    };
    assert_eq!(api::accept(&gw, &req, 1), Err(AcceptError::OfferNotFound));

    gw.release_slot("s1").unwrap();
    gw.on_capacity_freed("s1", 1).unwrap();
    let booking = api::accept(&gw, &req, 2).unwrap();
    assert_eq!(booking.subject_id, "a");
    assert_eq!(booking.entry_id, Some(entry.entry_id));
}

#[test]
fn test_session_snapshot_lists_pending_entries() {
    let gw = gateway();
    for subject in ["a", "b"] {
        api::join(&gw, &join_request(subject), 0).unwrap();
    }
    gw.release_slot("s1").unwrap();
    gw.on_capacity_freed("s1", 1).unwrap();
    gw.leave_waitlist("s1", "a", 2).unwrap();

    let snap = api::session_snapshot(&gw, "s1").unwrap();
    assert_eq!(snap.status, SessionStatus::Open);
    assert_eq!(snap.capacity, 1);
    assert_eq!(snap.confirmed_count, 0);
    assert_eq!(snap.unheld_free_slots, 0);
    assert_eq!(snap.waitlist.len(), 1);
    assert_eq!(snap.waitlist[0].subject_id, "b");
    assert_eq!(snap.waitlist[0].status, EntryStatus::Offered);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["status"], "open");
    assert_eq!(json["waitlist"][0]["status"], "offered");
}

#[test]
fn test_snapshot_unknown_session() {
    assert!(api::session_snapshot(&gateway(), "missing").is_err());
}

#[test]
fn test_health() {
    let health = api::health(&gateway());
    assert!(health.ok);
    assert_eq!(health.sessions, 1);
}
