use chrono::{DateTime, Local, TimeZone};

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn local_date_str(dt: &DateTime<Local>) -> String {
    dt.format(LOCAL_FORMAT).to_string()
}

pub fn now_local_str() -> String {
    local_date_str(&Local::now())
}

/// Formats a unix timestamp (seconds), as found in token `iat`/`exp`.
pub fn timestamp_to_local_str(secs: i64) -> Option<String> {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| local_date_str(&dt))
}
