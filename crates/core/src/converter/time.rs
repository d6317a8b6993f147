//! Timestamp parsing and formatting helpers.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::time::Duration;

static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+):(\d+):(\d+(?:\.\d*)?)$").expect("valid timestamp regex"));

/// Parses an `HH:MM:SS[.fraction]` timestamp into seconds.
///
/// Anything that does not match the format parses to `0.0`; encoder output is
/// best-effort and a bad timestamp is never an error.
pub fn parse_timestamp(value: &str) -> f64 {
    let Some(caps) = TIMESTAMP_RE.captures(value.trim()) else {
        return 0.0;
    };

    let hours: f64 = caps[1].parse().unwrap_or(0.0);
    let minutes: f64 = caps[2].parse().unwrap_or(0.0);
    let seconds: f64 = caps[3].parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds
}

/// Formats seconds as `HH:MM:SS`, truncating the fraction.
pub fn format_seconds(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Formats a wall-clock duration as `HH:MM:SS`.
pub fn format_duration(duration: Duration) -> String {
    format_seconds(duration.as_secs() as f64)
}
