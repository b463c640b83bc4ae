//! Tests for builder modules

use std::collections::HashMap;
use std::sync::Arc;

use prometheus_waitlist::builders::{build_gateway, session_from_config};
use prometheus_waitlist::config::{AllocationConfig, SessionConfig, SessionPolicy};
use prometheus_waitlist::core::{GatewayError, NoopNotifier, SessionStatus};
use prometheus_waitlist::infra::InMemorySessionStore;

fn config() -> AllocationConfig {
    let mut sessions = HashMap::new();
    sessions.insert(
        "s1".to_string(),
        SessionConfig {
            capacity: 2,
            confirmed_count: 2,
            policy: None,
        },
    );
    sessions.insert(
        "s2".to_string(),
        SessionConfig {
            capacity: 5,
            confirmed_count: 1,
            policy: Some(SessionPolicy {
                auto_promote: false,
                ..SessionPolicy::default()
            }),
        },
    );
    AllocationConfig {
        sessions,
        ..AllocationConfig::default()
    }
}

#[test]
fn test_session_from_config() {
    let cfg = config();
    let state = session_from_config(&cfg, "s1", &cfg.sessions["s1"]).unwrap();
    assert_eq!(state.id(), "s1");
    assert_eq!(state.status(), SessionStatus::Full);
    assert_eq!(state.policy(), &cfg.defaults);

    let state = session_from_config(&cfg, "s2", &cfg.sessions["s2"]).unwrap();
    assert!(!state.policy().auto_promote);
    assert_eq!(state.ledger().free_slots(), 4);
}

#[test]
fn test_build_gateway_registers_sessions() {
    let gateway = build_gateway(&config(), InMemorySessionStore::new(), Arc::new(NoopNotifier))
        .unwrap();
    assert_eq!(gateway.session_ids().unwrap(), vec!["s1".to_string(), "s2".to_string()]);
    assert_eq!(gateway.snapshot("s2").unwrap().ledger().confirmed(), 1);
}

#[test]
fn test_build_gateway_rejects_invalid_config() {
    let mut cfg = config();
    cfg.sessions.get_mut("s1").unwrap().confirmed_count = 9;
    let err = build_gateway(&cfg, InMemorySessionStore::new(), Arc::new(NoopNotifier))
        .err()
        .unwrap();
    assert!(matches!(err, GatewayError::Store(msg) if msg.starts_with("config invalid")));
}
