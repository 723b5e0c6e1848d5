pub mod logging;
pub mod time;

pub use time::{evidence_timestamp, format_clock, parse_duration_minutes};
