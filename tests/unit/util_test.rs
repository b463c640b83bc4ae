//! Tests for utility functions

use prometheus_waitlist::util::{
    init_tracing, new_entry_id, now_ms, offer_deadline_ms, MS_PER_MINUTE,
};

#[test]
fn test_offer_deadline() {
    assert_eq!(offer_deadline_ms(1_000, 30), 1_000 + 30 * MS_PER_MINUTE);
    assert_eq!(offer_deadline_ms(1_000, 0), 1_000);
}

#[test]
fn test_offer_deadline_saturates() {
    assert_eq!(offer_deadline_ms(u128::MAX - 1, 30), u128::MAX);
}

#[test]
fn test_now_ms_is_after_2020() {
    assert!(now_ms() > 1_577_836_800_000);
}

#[test]
fn test_entry_ids_are_unique() {
    let a = new_entry_id();
    let b = new_entry_id();
    assert_ne!(a, b);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    assert!(tracing::dispatcher::has_been_set());
}
