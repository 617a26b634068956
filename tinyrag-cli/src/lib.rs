//! # tinyrag-cli
//!
//! Command-line front end for `tinyrag-core`: `tinyrag ingest` builds the
//! store from a document file, `tinyrag ask` answers one question and
//! `tinyrag chat` runs an interactive session.

pub mod app;
pub mod cli;
pub mod commands;
pub mod documents;
pub mod telemetry;

use std::io;

use app::App;
use cli::{Cli, Command};

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let app = App::open(&cli.backend).await?;
    let mut out = io::stdout();

    match cli.command {
        Command::Ingest { file, format } => {
            commands::ingest::run_ingest(&app, &file, format, &mut out).await
        }
        Command::Ask { question, stream } => {
            commands::ask::run_ask(&app, &question, stream, &mut out).await
        }
        Command::Chat { stream } => commands::chat::run_chat(&app, stream, &mut out).await,
    }
}
