//! Human-readable durations.

use std::time::Duration;

/// Format seconds as `HH:MM:SS`.
///
/// Each unit is floored and zero-padded to two digits; hours grow past two
/// digits when needed. Negative and non-finite input formats as zero.
///
/// ```
/// use vidcover::format_duration;
///
/// assert_eq!(format_duration(0.0), "00:00:00");
/// assert_eq!(format_duration(3661.0), "01:01:01");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS` (seconds may be fractional).
///
/// # Errors
///
/// Returns a message describing the malformed input.
pub fn parse_timecode(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".to_string());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return to_duration(seconds, trimmed);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => ("0", *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return Err(format!("invalid time format: {trimmed}")),
    };

    let invalid = |_| format!("invalid time format: {trimmed}");
    let hours = hours.parse::<u64>().map_err(invalid)?;
    let minutes = minutes.parse::<u64>().map_err(invalid)?;
    let seconds = seconds
        .parse::<f64>()
        .map_err(|_| format!("invalid time format: {trimmed}"))?;

    let whole = hours
        .checked_mul(3600)
        .and_then(|total| total.checked_add(minutes.checked_mul(60)?))
        .ok_or_else(|| format!("invalid time value: {trimmed}"))?;

    to_duration(whole as f64 + seconds, trimmed)
}

fn to_duration(seconds: f64, original: &str) -> Result<Duration, String> {
    if !seconds.is_finite() {
        return Err(format!("invalid time value: {original}"));
    }
    Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|_| format!("invalid time value: {original}"))
}
