//! Builders to construct an allocation gateway from configuration.

use std::sync::Arc;

use crate::config::{AllocationConfig, SessionConfig};
use crate::core::{AllocationGateway, GatewayError, Notifier, SessionState, SessionStore};

/// Build one session's initial state from its configuration.
///
/// # Errors
///
/// [`GatewayError::Store`] when the configured counts are inconsistent.
pub fn session_from_config(
    cfg: &AllocationConfig,
    session_id: &str,
    session: &SessionConfig,
) -> Result<SessionState, GatewayError> {
    SessionState::new(
        session_id,
        session.capacity,
        session.confirmed_count,
        cfg.policy_for(session),
    )
    .map_err(|e| GatewayError::Store(format!("session `{session_id}` invalid: {e}")))
}

/// Build a gateway over `store`, registering every configured session.
///
/// # Errors
///
/// Invalid configuration, or a configured session already present in the store.
pub fn build_gateway<S: SessionStore>(
    cfg: &AllocationConfig,
    store: S,
    notifier: Arc<dyn Notifier>,
) -> Result<AllocationGateway<S>, GatewayError> {
    cfg.validate()
        .map_err(|e| GatewayError::Store(format!("config invalid: {e}")))?;

    let gateway = AllocationGateway::new(store).with_notifier(notifier);
    let mut ids: Vec<&String> = cfg.sessions.keys().collect();
    ids.sort();
    for id in ids {
        let state = session_from_config(cfg, id, &cfg.sessions[id])?;
        gateway.register_session(state)?;
    }
    tracing::info!(sessions = cfg.sessions.len(), "allocation gateway built");
    Ok(gateway)
}
