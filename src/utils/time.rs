//! Time parsing and formatting utilities

use std::time::Duration;

use chrono::Utc;

/// Milliseconds since the Unix epoch, used to name scratch and output files
pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a `HH:MM:SS.ms` clock value as printed by ffmpeg
pub fn parse_clock(text: &str) -> Option<Duration> {
    let text = text.trim();
    let mut parts = text.split(':');
    let (hours, minutes, seconds) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        (Some(m), Some(s), None, None) => ("0", m, s),
        _ => return None,
    };

    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    let whole = hours * 3600 + minutes * 60;
    Some(Duration::from_secs(whole) + Duration::from_secs_f64(seconds))
}

/// Format a duration as `HH:MM:SS.mmm`, or `MM:SS.mmm` under an hour
pub fn format_clock(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = duration.subsec_millis();

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
    }
}
