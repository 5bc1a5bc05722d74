//! `bru`: a documentation generator backed by a local content cache.

mod cli;
mod commands;
mod logging;

use crate::cli::Cli;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> miette::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    commands::run(cli).await
}
