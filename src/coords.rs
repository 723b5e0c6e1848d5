//! Pulls a `lat,lng` pair out of map viewer text.
//!
//! Street-level map URLs carry the camera position right after an `@`, e.g.
//! `https://www.google.com/maps/@-33.8688,151.2093,3a,75y,90t/data=...`.

use std::sync::OnceLock;

use regex::Regex;

static COORDINATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> &'static Regex {
    COORDINATE_PATTERN.get_or_init(|| {
        Regex::new(r"@(-?[0-9]+\.[0-9]+),(-?[0-9]+\.[0-9]+)").expect("coordinate pattern is valid")
    })
}

/// Returns the first `@lat,lng` pair in `text`.
///
/// Values are not range checked: a latitude of `123.4` is returned as-is.
pub fn extract_coordinates(text: &str) -> Option<(f64, f64)> {
    let captures = pattern().captures(text)?;
    let latitude = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let longitude = captures.get(2)?.as_str().parse::<f64>().ok()?;
    Some((latitude, longitude))
}
