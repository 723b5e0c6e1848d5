use chrono::{DateTime, TimeZone};

/// Format a second count as `MM:SS`, or `H:MM:SS` once it reaches an hour.
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Parse a duration typed by the player. Anything that is not a non-negative
/// integer clamps to zero, which makes the game an immediate loss.
pub fn parse_duration_minutes(input: &str) -> u64 {
    match input.trim().parse::<i64>() {
        Ok(value) if value >= 0 => value as u64,
        Ok(value) => {
            log::debug!("negative duration {value} clamped to 0");
            0
        }
        Err(err) => {
            log::debug!("unparseable duration {input:?} ({err}) clamped to 0");
            0
        }
    }
}

/// Timestamp used in evidence file names: `YYYY-MM-DD_HH-MM-SS`.
pub fn evidence_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}
