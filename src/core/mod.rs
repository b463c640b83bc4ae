//! Core allocation abstractions: capacity ledger, waitlist, offers, gateway.

pub mod audit;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod notify;
pub mod offer;
pub mod reaper;
pub mod session;
pub mod store;
pub mod waitlist;

pub use audit::{build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use error::{
    AcceptError, AppResult, BookingError, CapacityError, GatewayError, JoinError, LeaveError,
    OfferError,
};
pub use gateway::{AllocationGateway, Outcome};
pub use ledger::{CapacityLedger, ReservationToken};
pub use notify::{
    dispatch_all, NoopNotifier, Notification, NotificationEvent, Notifier, NotifyError,
    RecordingNotifier,
};
pub use reaper::{ReaperReport, Spawn};
pub use session::{Booking, Effects, SessionState, SessionStatus, Transition};
pub use store::SessionStore;
pub use waitlist::{
    Dequeued, EntryStatus, JoinPreferences, PositionChange, WaitlistEntry, WaitlistQueue,
};
