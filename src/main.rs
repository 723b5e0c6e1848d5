use clap::Parser;

use streetview_bingo_lib::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(err) = streetview_bingo_lib::run(Cli::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
