mod cli;
mod commands;
mod model;
mod pipeline;
mod schema;
mod store;
mod util;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Ingest(args) => commands::ingest::run(args),
        Commands::Query(args) => commands::query::run(args),
        Commands::Review(args) => commands::review::run(args),
        Commands::Status(args) => commands::status::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // {:#} renders the whole context chain on one line.
            error!(error = %format!("{err:#}"), "command failed");
            ExitCode::FAILURE
        }
    }
}
