//! Allocation engine configuration structures.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;
use crate::util::serde::SessionId;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "WAITLIST_CONFIG_PATH";
/// Environment variable overriding the reaper interval.
pub const REAPER_INTERVAL_ENV: &str = "WAITLIST_REAPER_INTERVAL_SECS";

/// Waitlist behaviour of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Whether subjects may queue once the session is full.
    pub waitlist_enabled: bool,
    /// Cap on active entries; `None` means unbounded.
    pub waitlist_limit: Option<u32>,
    /// How long an offer holds a slot.
    pub offer_window_minutes: u32,
    /// Offer freed slots to the queue without an admin.
    pub auto_promote: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            waitlist_enabled: true,
            waitlist_limit: None,
            offer_window_minutes: 30,
            auto_promote: true,
        }
    }
}

impl SessionPolicy {
    /// Validate policy values.
    pub fn validate(&self) -> Result<(), String> {
        if self.offer_window_minutes == 0 {
            return Err("offer_window_minutes must be greater than 0".into());
        }
        if self.waitlist_limit == Some(0) {
            return Err("waitlist_limit must be greater than 0 when set".into());
        }
        Ok(())
    }
}

/// Seed values for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Total slots.
    pub capacity: u32,
    /// Bookings already confirmed elsewhere.
    #[serde(default)]
    pub confirmed_count: u32,
    /// Per-session policy; falls back to [`AllocationConfig::defaults`].
    #[serde(default)]
    pub policy: Option<SessionPolicy>,
}

impl SessionConfig {
    /// Validate session values.
    pub fn validate(&self) -> Result<(), String> {
        if self.confirmed_count > self.capacity {
            return Err(format!(
                "confirmed_count {} exceeds capacity {}",
                self.confirmed_count, self.capacity
            ));
        }
        if let Some(policy) = &self.policy {
            policy.validate()?;
        }
        Ok(())
    }
}

const fn default_reaper_interval_secs() -> u64 {
    30
}

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Seconds between reaper sweeps.
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    /// Policy applied to sessions without their own.
    #[serde(default)]
    pub defaults: SessionPolicy,
    /// Sessions to register at startup.
    #[serde(default)]
    pub sessions: HashMap<SessionId, SessionConfig>,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            reaper_interval_secs: default_reaper_interval_secs(),
            defaults: SessionPolicy::default(),
            sessions: HashMap::new(),
        }
    }
}

impl AllocationConfig {
    /// Validate defaults and every session.
    pub fn validate(&self) -> Result<(), String> {
        if self.reaper_interval_secs == 0 {
            return Err("reaper_interval_secs must be greater than 0".into());
        }
        self.defaults
            .validate()
            .map_err(|e| format!("defaults invalid: {e}"))?;
        for (id, session) in &self.sessions {
            session
                .validate()
                .map_err(|e| format!("session `{id}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Effective policy for a configured session.
    #[must_use]
    pub fn policy_for(&self, session: &SessionConfig) -> SessionPolicy {
        session.policy.unwrap_or(self.defaults)
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&raw)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("loading config {}", path.display()))
    }
}

/// Load configuration from the environment.
///
/// A `.env` file is honoured if present. `WAITLIST_CONFIG_PATH` selects a JSON
/// file; without it the defaults apply. `WAITLIST_REAPER_INTERVAL_SECS`
/// overrides the sweep interval either way.
///
/// # Errors
///
/// Fails on unreadable or invalid configuration, or a malformed override.
pub fn load_from_env() -> AppResult<AllocationConfig> {
    let _ = dotenvy::dotenv();
    let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => AllocationConfig::from_file(path)?,
        Err(_) => AllocationConfig::default(),
    };
    if let Ok(raw) = std::env::var(REAPER_INTERVAL_ENV) {
        cfg.reaper_interval_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("{REAPER_INTERVAL_ENV}={raw} is not a number"))?;
    }
    cfg.validate().map_err(anyhow::Error::msg)?;
    tracing::debug!(
        sessions = cfg.sessions.len(),
        reaper_interval_secs = cfg.reaper_interval_secs,
        "allocation config loaded"
    );
    Ok(cfg)
}
