use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use crate::{
    settings::{load_catalog_file, BingoSettings},
    utils::parse_duration_minutes,
};

#[derive(Parser, Debug, Default)]
#[command(
    name = "streetview-bingo",
    version,
    about = "Spot items in a street-level map window before the clock runs out"
)]
pub struct Cli {
    /// Settings file (default: <config dir>/streetview-bingo/settings.json)
    #[arg(long)]
    pub settings: Option<PathBuf>,
    /// Round length in minutes; anything but a whole non-negative number means 0
    #[arg(long, allow_hyphen_values = true)]
    pub minutes: Option<String>,
    /// Directory for evidence screenshots
    #[arg(long)]
    pub screenshots: Option<PathBuf>,
    /// CSV file that receives one row per discovery
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Text that identifies the map window's title
    #[arg(long = "window-match")]
    pub window_match: Option<String>,
    /// Card file with one item per line
    #[arg(long)]
    pub catalog: Option<PathBuf>,
    /// Write the merged settings back to the settings file
    #[arg(long, action = ArgAction::SetTrue)]
    pub save_settings: bool,
    /// Start the round without waiting for a `start` command
    #[arg(long, action = ArgAction::SetTrue)]
    pub auto_start: bool,
    /// Quit once the round is over
    #[arg(long, action = ArgAction::SetTrue)]
    pub exit_on_finish: bool,
}

impl Cli {
    /// Overlay command-line flags on top of stored settings.
    pub fn apply(&self, mut settings: BingoSettings) -> Result<BingoSettings> {
        if let Some(minutes) = &self.minutes {
            settings.duration_minutes = parse_duration_minutes(minutes);
        }
        if let Some(dir) = &self.screenshots {
            settings.screenshot_dir = dir.clone();
        }
        if let Some(csv) = &self.csv {
            settings.csv_path = csv.clone();
        }
        if let Some(needle) = &self.window_match {
            settings.window_title_match = needle.clone();
        }
        if let Some(path) = &self.catalog {
            settings.catalog = load_catalog_file(path)?;
        }
        Ok(settings)
    }
}
