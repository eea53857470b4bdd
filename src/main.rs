#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use zaprelay::app;
use zaprelay::cli::commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // reqwest is built without a default rustls provider; pick ring explicitly.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    let cli = Cli::parse();
    let config = app::dispatch::load_config(cli.config.as_deref())?;
    zaprelay::observability::init_logging(&config.observability, cli.verbose)?;

    app::dispatch::dispatch(cli, Arc::new(config)).await
}
