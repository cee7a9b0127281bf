//! sync-relay binary entry point.
//!
//! Usage:
//! ```bash
//! kosync-relay --config relay.toml
//! RUST_LOG=debug kosync-relay
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use kosync_relay::{serve, Config, RelayServer};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = get_config_path();
    let config = if path.exists() {
        Config::from_file(&path).context("Failed to load configuration")?
    } else {
        tracing::info!(path = %path.display(), "no config file, using defaults");
        Config::default()
    };

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    let relay = Arc::new(RelayServer::new(config).context("Failed to build HTTP client")?);

    serve(relay, listener, shutdown_signal())
        .await
        .context("Relay server error")?;

    Ok(())
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("relay.toml"))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
