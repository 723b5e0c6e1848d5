pub mod cli;
pub mod coords;
pub mod models;
pub mod probe;
pub mod session;
pub mod settings;
pub mod sink;
pub mod terminal;
mod utils;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};

use cli::Cli;
use probe::{BrowserWindowProbe, EvidenceStore};
use session::{EventEmitter, SessionController};
use settings::{default_settings_path, SettingsStore};
use sink::CsvRecordSink;
use terminal::{run_terminal, TerminalOptions};

pub use utils::{format_clock, parse_duration_minutes};

pub async fn run(cli: Cli) -> Result<()> {
    // Logs go to stderr; stdout belongs to the game.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Street View Bingo starting up...");

    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let store = SettingsStore::new(settings_path)?;
    let settings = cli.apply(store.settings())?;
    if cli.save_settings {
        store.update(settings.clone())?;
        log::info!("Saved settings to {}", store.path().display());
    }

    let catalog = settings.catalog()?;

    let evidence = EvidenceStore::new(&settings.screenshot_dir);
    evidence.ensure_dir()?;
    let probe = BrowserWindowProbe::new(settings.window_title_match.clone(), evidence);
    let sink = CsvRecordSink::new(&settings.csv_path).with_eager_header(settings.eager_csv_header);

    let (emitter, events) = EventEmitter::channel();
    let controller = SessionController::new(catalog.clone(), Arc::new(probe), Arc::new(sink), emitter)
        .with_probe_timeout(Duration::from_secs(settings.probe_timeout_secs.max(1)));

    run_terminal(
        controller,
        catalog,
        events,
        TerminalOptions {
            default_minutes: settings.duration_minutes,
            grid_columns: settings.grid_columns,
            auto_start: cli.auto_start,
            exit_on_finish: cli.exit_on_finish,
        },
    )
    .await
    .context("game loop failed")
}
