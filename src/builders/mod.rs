//! Builders to construct allocation components from configuration.

pub mod gateway_builder;

pub use gateway_builder::{build_gateway, session_from_config};
