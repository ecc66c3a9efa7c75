//! Parsing of ffmpeg `-progress` key/value lines and stderr headers

use std::time::Duration;

use super::time::parse_clock;

/// Output position carried by a `-progress` line, if any
///
/// `out_time_ms` is reported in microseconds as well, despite its name.
pub fn parse_out_time(line: &str) -> Option<Duration> {
    let (key, value) = line.trim().split_once('=')?;
    match key.trim() {
        "out_time_us" | "out_time_ms" => {
            let micros: i64 = value.trim().parse().ok()?;
            (micros >= 0).then(|| Duration::from_micros(micros as u64))
        }
        "out_time" => parse_clock(value),
        _ => None,
    }
}

/// Whether a `-progress` line marks the end of the run
pub fn is_progress_end(line: &str) -> bool {
    line.trim() == "progress=end"
}

/// Input duration from the `Duration: HH:MM:SS.xx, start: …` stderr header
pub fn parse_duration_header(line: &str) -> Option<Duration> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    let value = rest.split(',').next()?.trim();
    parse_clock(value)
}
