//! Clock & ID source — wall-clock timestamps and unique command ids.
//!
//! Ids are `"<millis>-<seq>"`, where `seq` is a process-wide monotonic
//! counter. Two ids minted in the same millisecond still differ, and the
//! string ordering of `millis` keeps ids non-decreasing over time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Current wall-clock time in whole milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as i64
}

/// Current time as an RFC 3339 / ISO-8601 string, for wire transport.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

pub fn to_iso(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

/// Mint a broker-assigned command id, guaranteed unique within this process.
pub fn new_command_id() -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", now_millis(), seq)
}
