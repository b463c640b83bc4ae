//! Infrastructure adapters for session storage backends.

pub mod store;

pub use store::InMemorySessionStore;
