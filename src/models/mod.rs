pub mod backup;
pub mod drive_file;

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
/// comparison in SQL matches chronological order.
pub fn fmt_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn now_ts() -> String {
    fmt_ts(Utc::now())
}
