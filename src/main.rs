use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use docname::cli::{Cli, commands};
use docname::config::Settings;
use docname::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    logging::init_with_config(&settings.logging, cli.log_level());

    commands::run(cli, Arc::new(settings)).await
}
