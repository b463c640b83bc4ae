//! Capacity ledger: confirmed bookings versus session capacity.
//!
//! The ledger owns the confirmed-count counter. It is embedded in
//! [`SessionState`](crate::core::SessionState), which is only handed out inside
//! the gateway's per-session lock, so none of these methods synchronise on their own.

use serde::{Deserialize, Serialize};

use crate::core::CapacityError;
use crate::util::serde::SessionId;

/// Proof that a slot was reserved. Carried by the resulting booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationToken {
    /// Session the slot belongs to.
    pub session_id: SessionId,
    /// Ledger-local sequence number of the reservation.
    pub sequence: u64,
}

/// Confirmed-count accounting for a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityLedger {
    capacity: u32,
    confirmed: u32,
    next_sequence: u64,
}

impl CapacityLedger {
    /// Create a ledger with `confirmed` slots already taken.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::BelowConfirmed`] if `confirmed > capacity`.
    pub const fn new(capacity: u32, confirmed: u32) -> Result<Self, CapacityError> {
        if confirmed > capacity {
            return Err(CapacityError::BelowConfirmed {
                confirmed,
                requested: capacity,
            });
        }
        Ok(Self {
            capacity,
            confirmed,
            next_sequence: 0,
        })
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Confirmed bookings.
    #[must_use]
    pub const fn confirmed(&self) -> u32 {
        self.confirmed
    }

    /// Slots not yet confirmed.
    #[must_use]
    pub const fn free_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.confirmed)
    }

    /// Whether at least one slot is unconfirmed.
    #[must_use]
    pub const fn has_free_slot(&self) -> bool {
        self.confirmed < self.capacity
    }

    /// Take one slot. This is the only path that increments the confirmed count.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::CapacityExceeded`] when every slot is confirmed.
    pub fn reserve_slot(&mut self, session_id: &str) -> Result<ReservationToken, CapacityError> {
        if !self.has_free_slot() {
            return Err(CapacityError::CapacityExceeded);
        }
        self.confirmed += 1;
        self.next_sequence += 1;
        Ok(ReservationToken {
            session_id: session_id.to_owned(),
            sequence: self.next_sequence,
        })
    }

    /// Give back one confirmed slot.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::NothingToRelease`] when no slot is confirmed.
    pub const fn release_slot(&mut self) -> Result<(), CapacityError> {
        if self.confirmed == 0 {
            return Err(CapacityError::NothingToRelease);
        }
        self.confirmed -= 1;
        Ok(())
    }

    /// Change capacity. Shrinking below the confirmed count is refused.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::BelowConfirmed`] if `capacity < confirmed`.
    pub const fn set_capacity(&mut self, capacity: u32) -> Result<(), CapacityError> {
        if capacity < self.confirmed {
            return Err(CapacityError::BelowConfirmed {
                confirmed: self.confirmed,
                requested: capacity,
            });
        }
        self.capacity = capacity;
        Ok(())
    }
}
