//! Display helpers shared by every page.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a backend timestamp. Accepts RFC 3339 and the naive
/// `YYYY-MM-DD HH:MM:SS[.f]` form (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Relative age of `raw` against `now`, e.g. `5 min ago`.
/// Unparsable input is returned unchanged.
pub fn format_time_ago_at(raw: &str, now: DateTime<Utc>) -> String {
    let Some(ts) = parse_timestamp(raw) else {
        return raw.to_string();
    };
    let diff = now.signed_duration_since(ts);
    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{minutes} min ago")
    } else if hours < 24 {
        format!("{hours} h ago")
    } else {
        format!("{days} d ago")
    }
}

pub fn format_time_ago(raw: &str) -> String {
    format_time_ago_at(raw, Utc::now())
}

/// One decimal place, no unit.
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}")
}
