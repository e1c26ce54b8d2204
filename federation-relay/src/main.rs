//! federation-relay binary entry point.
//!
//! Usage:
//! ```bash
//! federation-relay --config federation.toml
//! INSTANCE_HOSTNAME=a.example.com federation-relay
//! federation-relay --help
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use deblog_federation_relay::config::{Config, DEFAULT_CONFIG_PATH};
use deblog_federation_relay::http::{self, health};
use deblog_federation_relay::server::FederationRelay;
use deblog_federation_relay::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Peer-to-peer federation relay for DeBlog instances.
#[derive(Parser, Debug)]
#[command(name = "federation-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults are used if the default path is absent)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_file_or_default(Path::new(DEFAULT_CONFIG_PATH))?,
    };
    config.apply_env_overrides();
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    match config.federation.own_hostname() {
        Some(hostname) => tracing::info!("Federating as {}", hostname),
        None => tracing::warn!("INSTANCE_HOSTNAME not configured, broadcasts will be skipped"),
    }

    health::init_start_time();

    let storage = SqliteStorage::new(&config.storage.database, config.storage.max_connections)
        .await
        .with_context(|| format!("opening database {:?}", config.storage.database))?;
    tracing::info!("'peers' and 'federated_posts' tables are ready");

    let bind_address = config.server.bind_address.clone();
    let relay = Arc::new(FederationRelay::new(config, storage)?);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {}", bind_address))?;
    tracing::info!(
        "federation-relay v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        bind_address
    );

    http::serve(listener, relay, shutdown_signal()).await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, run until killed
        std::future::pending::<()>().await;
    }
}
