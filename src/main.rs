mod config;
mod errors;
mod models;
mod presentation;
mod render;
mod runtime;
mod services;
mod tracker;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use crate::{
    config::Config,
    runtime::{Event, Runtime},
    services::ResearchClient,
};

#[derive(Parser, Debug)]
#[command(name = "research-tracker", version, about = "Submit and track COBS Bread review research")]
struct Cli {
    /// Configuration file (defaults to config/default.toml if present)
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Research backend base URL
    #[arg(long = "base-url", value_name = "URL")]
    base_url: Option<String>,
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,
    /// Check backend health and exit
    #[arg(long = "check")]
    check: bool,
    /// Location to research right away
    location: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Load configuration
    let mut config = Config::load(args.config_path.as_deref()).context("load configuration")?;
    if let Some(base_url) = args.base_url {
        config.server.base_url = base_url;
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(log_level)?;

    let client = ResearchClient::new(&config).context("build research client")?;

    if args.check {
        return match client.check_health().await {
            Ok(health) => {
                render::info(&format!("{} is {}", client.base_url(), health.status));
                Ok(())
            }
            Err(e) => bail!("backend at {} is unreachable: {}", client.base_url(), e),
        };
    }

    let shutdown = CancellationToken::new();
    setup_signal_handler(shutdown.clone());

    let runtime = Runtime::new(&config, Arc::new(client), shutdown.clone());
    let events = runtime.sender();

    render::banner(&config);
    if let Some(location) = args.location {
        events
            .send(Event::Input(location))
            .map_err(|e| anyhow!("queue initial location: {}", e))?;
    }
    runtime::spawn_input_reader(events).context("start input reader")?;

    runtime.run().await.context("run tracker")?;
    Ok(())
}

// Logs go to stderr so they do not tear the progress line on stdout
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl-C handler: {}", err);
            return;
        }
        tracing::info!("Received Ctrl-C, shutting down");
        shutdown.cancel();
    });
}
