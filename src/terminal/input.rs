use crate::{models::Catalog, utils::parse_duration_minutes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `None` means "use the configured length".
    Start(Option<u64>),
    Mark(String),
    Grid,
    Status,
    Reset,
    Help,
    Quit,
}

/// Parse one input line. Marks are resolved to catalog labels here so the
/// session only ever sees real labels.
///
/// A line that names a card item exactly is a mark, even when its first word
/// is also a command (`Start line`, `Status board`).
pub fn parse_command(line: &str, catalog: &Catalog) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(item) = catalog.find(line) {
        return Ok(Some(Command::Mark(item.label().to_string())));
    }

    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "start" | "go" => Command::Start(if rest.is_empty() {
            None
        } else {
            Some(parse_duration_minutes(rest))
        }),
        "mark" | "m" if !rest.is_empty() => Command::Mark(resolve_item(rest, catalog)?),
        "mark" | "m" => return Err("mark what? give a number or an item name".into()),
        "grid" | "card" => Command::Grid,
        "status" => Command::Status,
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Mark(resolve_item(line, catalog)?),
    };
    Ok(Some(command))
}

fn resolve_item(selector: &str, catalog: &Catalog) -> Result<String, String> {
    let item = match selector.parse::<usize>() {
        Ok(position) => catalog.by_position(position),
        Err(_) => catalog.find(selector),
    };
    item.map(|item| item.label().to_string())
        .ok_or_else(|| format!("{selector:?} is not on the card"))
}
