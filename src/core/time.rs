//! Shared UTC timestamp helpers.

use chrono::{DateTime, Utc};

/// Stamp embedded in snapshot file names and commit messages
/// (e.g. `20250301_134501_042117`).
pub fn snapshot_stamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y%m%d_%H%M%S_%6f").to_string()
}

/// Compact microsecond stamp used for workspace directory names.
pub fn workspace_stamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y%m%d%H%M%S%6f").to_string()
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
