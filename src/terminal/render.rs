use std::collections::HashSet;

use crate::{
    models::{Catalog, GameResult, SessionPhase, SessionSnapshot, SessionSummary},
    session::SessionEvent,
    utils::format_clock,
};

const CELL_WIDTH: usize = 24;

pub const HELP: &str = "\
commands:
  start [minutes]     begin the round (default length from settings)
  <n> | mark <n|name> mark an item you can see in the map window
  grid                show the card
  status              time left and items found
  reset               new round after the previous one ended
  quit                leave";

/// The card as a grid, found items ticked.
pub fn render_grid(catalog: &Catalog, found: &[String], columns: usize) -> String {
    let columns = columns.max(1);
    let found: HashSet<&str> = found.iter().map(String::as_str).collect();

    let mut out = String::new();
    for (row_index, row) in catalog.items().chunks(columns).enumerate() {
        let mut line = String::new();
        for (col_index, item) in row.iter().enumerate() {
            let position = row_index * columns + col_index + 1;
            let mark = if found.contains(item.label()) { 'x' } else { ' ' };
            let cell = format!("[{mark}] {position:>2} {}", item.label());
            line.push_str(&format!("{:<width$}", truncate(&cell, CELL_WIDTH), width = CELL_WIDTH));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn render_status(snapshot: &SessionSnapshot) -> String {
    let found = snapshot.found.len();
    match snapshot.phase {
        SessionPhase::NotStarted => format!(
            "not started; {} items on the card. type `start` to begin",
            snapshot.catalog_size
        ),
        SessionPhase::Running => format!(
            "{} left, {found}/{} found",
            format_clock(snapshot.remaining_secs),
            snapshot.catalog_size
        ),
        SessionPhase::Finished => match &snapshot.summary {
            Some(summary) => render_summary(summary),
            None => "finished".to_string(),
        },
    }
}

pub fn render_summary(summary: &SessionSummary) -> String {
    let headline = match summary.result {
        GameResult::Win => "BINGO! every item found",
        GameResult::Loss => "time's up",
    };
    format!(
        "{headline}: {} found, {} remaining, {} taken",
        summary.items_found,
        summary.items_remaining,
        format_clock(summary.time_taken_secs)
    )
}

/// Text for one event, or `None` when it is not worth a line.
pub fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::SessionStarted {
            total_duration_secs,
            ..
        } => Some(format!("round started: {}", format_clock(*total_duration_secs))),
        SessionEvent::TimerTick { remaining_secs } => {
            let remaining = *remaining_secs;
            let announce = remaining > 0 && (remaining % 60 == 0 || remaining <= 10);
            announce.then(|| format!("{} left", format_clock(remaining)))
        }
        SessionEvent::DiscoverySucceeded {
            label,
            latitude,
            longitude,
            found,
            total,
            ..
        } => Some(format!("found {label} at {latitude}, {longitude} ({found}/{total})")),
        SessionEvent::DiscoveryFailed { label, reason } => {
            Some(format!("warning: could not read coordinates for {label}: {reason}"))
        }
        SessionEvent::SinkWriteFailed { label, message } => Some(match label {
            Some(label) => format!("ERROR: {label} was not saved: {message}"),
            None => format!("ERROR: could not clear old records: {message}"),
        }),
        SessionEvent::SessionFinished { summary } => Some(render_summary(summary)),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max - 1 {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 2).collect();
    out.push('…');
    out
}
