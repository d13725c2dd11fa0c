//! Wall-clock helpers.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Render a millisecond Unix timestamp as RFC 3339 (UTC).
pub fn format_timestamp_ms(ms: u64) -> String {
    format_unix_nanos(i128::from(ms) * 1_000_000)
}

/// Render fractional Unix seconds as RFC 3339 (UTC).
///
/// Negative, NaN and out-of-range inputs render as the epoch.
pub fn format_unix_seconds(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return format_unix_nanos(0);
    }
    format_unix_nanos((secs * 1e9) as i128)
}

fn format_unix_nanos(nanos: i128) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
