//! # Prometheus Waitlist
//!
//! Session capacity and waitlist allocation engine for the Prometheus booking
//! platform.
//!
//! When a bookable session is full, interested subjects park in a per-session
//! waitlist. When a slot frees up (a cancellation or a capacity increase), the
//! engine offers it exactly once to the head of the queue, holds it for a
//! bounded window, and then either confirms the booking or passes the slot on.
//!
//! ## Components
//!
//! - **Capacity Ledger** ([`core::CapacityLedger`]): confirmed count vs capacity,
//!   the only path that takes a slot
//! - **Waitlist Queue** ([`core::WaitlistQueue`]): FIFO entries with dense positions
//! - **Offer Manager** ([`core::offer`]): `active → offered → promoted | declined | expired`
//! - **Expiry Reaper** ([`core::ReaperReport`], [`runtime::ExpiryReaper`]): periodic sweep of overdue offers
//! - **Allocation Gateway** ([`core::AllocationGateway`]): per-session mutual exclusion
//!   around every mutation
//!
//! Booking handlers, admin tools, the reaper, and payment callbacks all go
//! through the gateway. It serializes them per session and returns each result
//! with the notification intents it produced.
//!
//! ```rust,ignore
//! use prometheus_waitlist::config::SessionPolicy;
//! use prometheus_waitlist::core::{AllocationGateway, JoinPreferences, SessionState};
//! use prometheus_waitlist::infra::InMemorySessionStore;
//! use prometheus_waitlist::util::now_ms;
//!
//! let gateway = AllocationGateway::new(InMemorySessionStore::new());
//! gateway.register_session(SessionState::new("u10-training", 12, 12, SessionPolicy::default())?)?;
//!
//! let entry = gateway
//!     .join_waitlist("u10-training", "player-7", JoinPreferences::default(), now_ms())?
//!     .value;
//!
//! // a booking is cancelled elsewhere
//! gateway.release_slot("u10-training")?;
//! gateway.on_capacity_freed("u10-training", now_ms())?;
//!
//! // payment captured by the caller, then:
//! let booking = gateway.accept_offer(entry.id, true, now_ms())?.value;
//! ```
//!
//! For complete scenarios, see `tests/allocation_scenarios_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core allocation abstractions: ledger, waitlist, offers, gateway, reaper.
pub mod core;
/// Configuration models for sessions, policies, and the reaper.
pub mod config;
/// Builders to construct the gateway from configuration.
pub mod builders;
/// Infrastructure adapters for session storage backends.
pub mod infra;
/// Runtime adapters (tokio reaper task) and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
