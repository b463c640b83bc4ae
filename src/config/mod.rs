//! Configuration models for sessions, waitlist policy, and the expiry reaper.

pub mod allocation;

pub use allocation::{load_from_env, AllocationConfig, SessionConfig, SessionPolicy};
