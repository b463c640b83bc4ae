//! Wall-clock helpers. All engine timestamps are milliseconds since the Unix epoch.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in one minute, used to turn offer windows into deadlines.
pub const MS_PER_MINUTE: u128 = 60_000;

/// Current time in milliseconds since the Unix epoch.
///
/// A clock set before the epoch reports `0` rather than failing.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Deadline for an offer made at `now_ms` with a window of `window_minutes`.
#[must_use]
pub fn offer_deadline_ms(now_ms: u128, window_minutes: u32) -> u128 {
    now_ms.saturating_add(u128::from(window_minutes) * MS_PER_MINUTE)
}
