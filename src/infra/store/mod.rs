//! Session store backends.

pub mod memory;

pub use memory::InMemorySessionStore;
