//! Structured logging setup for hosts embedding the engine.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset: offers, expiries, and reaper
/// failures at info, everything else quiet.
pub const DEFAULT_LOG_DIRECTIVE: &str = "warn,prometheus_waitlist=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_DIRECTIVE`]. Does nothing if the host already installed one.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
    {
        tracing::debug!("tracing initialised");
    }
}
