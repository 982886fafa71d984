//! Timestamp helpers. All VeilFS timestamps are u64 unix seconds.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as unix seconds. Returns 0 if the clock is before the epoch.
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
