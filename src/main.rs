use anyhow::Context;
use brc_datagen::cli::{run, Cli};
use brc_datagen::utils::{init_logging, log_level};
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(log_level(cli.verbose, cli.quiet), cli.log_file.as_deref())?;

    run(cli).await.context("brc-datagen failed")
}
