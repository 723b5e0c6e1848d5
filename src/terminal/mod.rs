//! Line-oriented front end: reads commands from stdin, prints session events.

mod input;
mod render;

pub use input::{parse_command, Command};
pub use render::{render_event, render_grid, render_status, render_summary, HELP};

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::mpsc::UnboundedReceiver,
};

use crate::{
    models::Catalog,
    session::{MarkResult, SessionController, SessionEvent},
};

pub struct TerminalOptions {
    pub default_minutes: u64,
    pub grid_columns: usize,
    pub auto_start: bool,
    pub exit_on_finish: bool,
}

pub async fn run_terminal(
    controller: SessionController,
    catalog: Catalog,
    mut events: UnboundedReceiver<SessionEvent>,
    options: TerminalOptions,
) -> Result<()> {
    println!("{HELP}\n");
    print!("{}", render_grid(&catalog, &[], options.grid_columns));

    if options.auto_start {
        start(&controller, options.default_minutes).await;
    }

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    debug!("stdin closed");
                    break;
                };
                let command = match parse_command(&line, &catalog) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };

                match command {
                    Command::Start(minutes) => {
                        start(&controller, minutes.unwrap_or(options.default_minutes)).await;
                    }
                    Command::Mark(label) => {
                        // Probing can take seconds; keep reading input meanwhile.
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            match controller.attempt_discovery(&label).await {
                                Ok(MarkResult::Skipped(reason)) => {
                                    debug!("mark for {label} skipped: {reason:?}");
                                }
                                Ok(_) => {}
                                Err(err) => warn!("mark for {label} rejected: {err}"),
                            }
                        });
                    }
                    Command::Grid => {
                        let snapshot = controller.snapshot().await;
                        print!("{}", render_grid(&catalog, &snapshot.found, options.grid_columns));
                    }
                    Command::Status => println!("{}", render_status(&controller.snapshot().await)),
                    Command::Reset => match controller.reset_session().await {
                        Ok(_) => {
                            println!("new card ready; type `start` to play again");
                            print!("{}", render_grid(&catalog, &[], options.grid_columns));
                        }
                        Err(err) => println!("{err}"),
                    },
                    Command::Help => println!("{HELP}"),
                    Command::Quit => break,
                }
            }
            Some(event) = events.recv() => {
                if let Some(text) = render_event(&event) {
                    println!("{text}");
                }
                if let SessionEvent::SessionFinished { .. } = event {
                    let snapshot = controller.snapshot().await;
                    print!("{}", render_grid(&catalog, &snapshot.found, options.grid_columns));
                    if options.exit_on_finish {
                        break;
                    }
                    println!("type `reset` for another round or `quit` to leave");
                }
            }
        }
    }

    controller.shutdown().await
}

async fn start(controller: &SessionController, minutes: u64) {
    if let Err(err) = controller.start_session(minutes).await {
        println!("{err}");
    }
}
