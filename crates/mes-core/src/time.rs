//! Wall-clock helpers.
//!
//! Due dates are entered as plain wall-clock values with no zone attached.
//! The prediction model was trained against creation times in KST (a fixed
//! UTC+9 offset), so creation timestamps are shifted onto that clock before
//! any calendar feature is derived from them.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::error::{MesError, Result};

/// Offset of the clock the model was trained on.
pub const KST_OFFSET_SECS: i32 = 9 * 3600;

/// `now` as a KST wall-clock value, truncated to whole seconds.
pub fn kst_wall_clock(now: DateTime<Utc>) -> NaiveDateTime {
    let local = now.naive_utc() + Duration::seconds(KST_OFFSET_SECS as i64);
    local.with_nanosecond(0).unwrap_or(local)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a due date from `YYYY-MM-DDTHH:MM[:SS]` (a space separator is also
/// accepted) or a bare `YYYY-MM-DD`, which means midnight.
pub fn parse_due_date(raw: &str) -> Result<NaiveDateTime> {
    let s = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| MesError::InvalidDate(raw.to_string()))
}
