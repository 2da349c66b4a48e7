//! Pure duration arithmetic and display formatting

use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// All deadline arithmetic in the timer document uses this reference; the
/// in-process store commits its write timestamps from the same clock.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Combine free-text minute and second inputs into milliseconds.
///
/// Non-numeric or negative input degrades to 0 rather than erroring, so a
/// half-typed form field can never break a controller action.
pub fn to_millis(minutes: &str, seconds: &str) -> u64 {
    let minutes = parse_non_negative(minutes);
    let seconds = parse_non_negative(seconds);
    minutes
        .saturating_mul(60)
        .saturating_add(seconds)
        .saturating_mul(1000)
}

fn parse_non_negative(text: &str) -> u64 {
    text.trim().parse::<i64>().unwrap_or(0).max(0) as u64
}

/// Format milliseconds as a zero-padded `MM:SS` countdown string.
///
/// Negative input clamps to zero. Minutes are not rolled over into hours,
/// so a 90-minute leg renders as `90:00`.
pub fn format_remaining(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
