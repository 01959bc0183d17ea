use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{config::DEFAULT_SETTINGS_FILE, load_settings};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod console;
mod controller;

use controller::{
    events::parse_command,
    orchestration::{AppController, Flow},
};

#[derive(Parser, Debug)]
#[command(about = "People list editor with deferred batch saving")]
struct Args {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Read commands from a file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(&args.config);
    info!(group = %settings.batch_group, "starting people console");

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open script '{}'", path.display()))?,
        )),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut app = AppController::new(&settings, true);
    info!(rows = app.collection().visible().len(), "sample data loaded");
    app.screen().print("type 'help' for commands");

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        match parse_command(&line) {
            Ok(Some(command)) => {
                if app.dispatch(command).await == Flow::Quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => app.screen().print(err.to_string()),
        }
    }

    if app.screen().has_open_alert() {
        info!("exiting with an unacknowledged alert");
    }
    info!("people console stopped");
    Ok(())
}
