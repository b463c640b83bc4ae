//! Tests for configuration validation

use prometheus_waitlist::config::{AllocationConfig, SessionConfig, SessionPolicy};

#[test]
fn test_session_policy_defaults_validate() {
    let policy = SessionPolicy::default();
    assert!(policy.waitlist_enabled);
    assert!(policy.auto_promote);
    assert_eq!(policy.waitlist_limit, None);
    assert_eq!(policy.offer_window_minutes, 30);
    assert!(policy.validate().is_ok());
}

#[test]
fn test_session_policy_invalid_window() {
    let invalid = SessionPolicy {
        offer_window_minutes: 0,
        ..SessionPolicy::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_session_policy_invalid_limit() {
    let invalid = SessionPolicy {
        waitlist_limit: Some(0),
        ..SessionPolicy::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_session_config_confirmed_above_capacity() {
    let invalid = SessionConfig {
        capacity: 2,
        confirmed_count: 3,
        policy: None,
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_allocation_config_from_json() {
    let json = r#"{
        "reaper_interval_secs": 15,
        "defaults": { "offer_window_minutes": 20 },
        "sessions": {
            "u12-saturday": { "capacity": 12, "confirmed_count": 12 },
            "u8-sunday": {
                "capacity": 10,
                "policy": { "waitlist_limit": 5, "auto_promote": false }
            }
        }
    }"#;
    let cfg = AllocationConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.reaper_interval_secs, 15);
    assert_eq!(cfg.sessions.len(), 2);

    let saturday = &cfg.sessions["u12-saturday"];
    let policy = cfg.policy_for(saturday);
    assert_eq!(policy.offer_window_minutes, 20);
    assert!(policy.auto_promote);

    let sunday = &cfg.sessions["u8-sunday"];
    assert_eq!(sunday.confirmed_count, 0);
    let policy = cfg.policy_for(sunday);
    assert_eq!(policy.waitlist_limit, Some(5));
    assert!(!policy.auto_promote);
    // per-session policy does not inherit from defaults
    assert_eq!(policy.offer_window_minutes, 30);
}

#[test]
fn test_allocation_config_defaults_when_empty() {
    let cfg = AllocationConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg.reaper_interval_secs, 30);
    assert!(cfg.sessions.is_empty());
}

#[test]
fn test_allocation_config_rejects_invalid_session() {
    let json = r#"{ "sessions": { "s1": { "capacity": 1, "confirmed_count": 2 } } }"#;
    let err = AllocationConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("s1"), "unexpected error: {err}");
}

#[test]
fn test_allocation_config_rejects_zero_interval() {
    assert!(AllocationConfig::from_json_str(r#"{ "reaper_interval_secs": 0 }"#).is_err());
}

#[test]
fn test_allocation_config_parse_error() {
    let err = AllocationConfig::from_json_str("not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_allocation_config_from_missing_file() {
    assert!(AllocationConfig::from_file("/nonexistent/waitlist.json").is_err());
}

#[test]
fn test_load_from_env() {
    use prometheus_waitlist::config::allocation::{CONFIG_PATH_ENV, REAPER_INTERVAL_ENV};
    use prometheus_waitlist::config::load_from_env;

    let path = std::env::temp_dir().join(format!("waitlist-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "sessions": { "s1": { "capacity": 4 } } }"#).unwrap();
    std::env::set_var(CONFIG_PATH_ENV, &path);
    std::env::set_var(REAPER_INTERVAL_ENV, "5");

    let cfg = load_from_env().unwrap();
    assert_eq!(cfg.reaper_interval_secs, 5);
    assert_eq!(cfg.sessions["s1"].capacity, 4);

    std::env::set_var(REAPER_INTERVAL_ENV, "soon");
    assert!(load_from_env().is_err());

    std::env::remove_var(CONFIG_PATH_ENV);
    std::env::remove_var(REAPER_INTERVAL_ENV);
    let _ = std::fs::remove_file(path);
}
