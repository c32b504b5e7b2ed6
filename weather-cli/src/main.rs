//! Binary crate for the `weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - The interactive prompt loop and one-shot lookups
//! - Rendering the dashboard panel

use clap::Parser;
use std::process::ExitCode;

mod cli;
mod logger;
mod render;
mod session;

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = cli::Cli::parse();
    if let Err(err) = logger::init(cmd.debug) {
        eprintln!("ERROR: failed to initialise logging: {err:#}");
        return ExitCode::FAILURE;
    }

    match cmd.run().await {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("ERROR: {err:#}");
            ExitCode::FAILURE
        }
    }
}
