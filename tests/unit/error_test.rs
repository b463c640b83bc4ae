//! Tests for error types

use prometheus_waitlist::core::{
    AcceptError, BookingError, CapacityError, GatewayError, JoinError, LeaveError,
};

#[test]
fn test_capacity_exceeded_error() {
    let err = CapacityError::CapacityExceeded;
    assert_eq!(format!("{}", err), "capacity exceeded");
}

#[test]
fn test_below_confirmed_error() {
    let err = CapacityError::BelowConfirmed {
        confirmed: 5,
        requested: 3,
    };
    assert_eq!(format!("{}", err), "capacity 3 is below confirmed count 5");
}

#[test]
fn test_no_untracked_slot_error() {
    assert_eq!(
        CapacityError::NoUntrackedSlot.to_string(),
        "every confirmed slot belongs to a tracked booking"
    );
}

#[test]
fn test_accept_error_messages() {
    assert_eq!(AcceptError::OfferExpired.to_string(), "offer expired");
    assert_eq!(AcceptError::OfferNotFound.to_string(), "offer not found");
    assert_eq!(AcceptError::PaymentNotConfirmed.to_string(), "payment not confirmed");
    assert_eq!(AcceptError::CapacityRaceDetected.to_string(), "capacity race detected");
}

#[test]
fn test_waitlist_full_error() {
    let err = JoinError::WaitlistFull { limit: 3 };
    assert_eq!(format!("{}", err), "waitlist full (limit 3)");
}

#[test]
fn test_gateway_error_is_transparent() {
    let err: JoinError = GatewayError::SessionNotFound("s1".into()).into();
    assert_eq!(err.to_string(), "session not found: s1");

    let err: LeaveError = GatewayError::Store("connection failed".into()).into();
    assert_eq!(err.to_string(), "store error: connection failed");
}

#[test]
fn test_booking_wraps_capacity_error() {
    let err: BookingError = CapacityError::CapacityExceeded.into();
    assert_eq!(err, BookingError::Capacity(CapacityError::CapacityExceeded));
    assert_eq!(err.to_string(), "capacity exceeded");
}
