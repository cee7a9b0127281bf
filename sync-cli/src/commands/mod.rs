//! CLI command implementations.

pub mod digest;
pub mod login;
pub mod logout;
pub mod pull;
pub mod push;
pub mod settings;
pub mod status;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use sync_client::{ClientConfig, HttpTransport, KoSyncClient};

use crate::config::FileSettingsStore;

/// Per-request timeout for server calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Global options shared by every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    data_dir: PathBuf,
    relay: Option<String>,
}

impl CliContext {
    /// Context for a data directory and optional relay endpoint.
    pub fn new(data_dir: PathBuf, relay: Option<String>) -> Self {
        Self { data_dir, relay }
    }

    /// The settings file of this data directory.
    pub fn store(&self) -> FileSettingsStore {
        FileSettingsStore::new(&self.data_dir)
    }

    /// Transport for `server_url`, through the relay when one applies.
    pub fn transport(&self, server_url: &str) -> Result<HttpTransport> {
        HttpTransport::for_server(server_url, self.relay.as_deref(), Some(REQUEST_TIMEOUT))
            .with_context(|| format!("Invalid server or relay URL for {server_url}"))
    }

    /// Client for the logged-in account.
    pub fn client(&self) -> Result<KoSyncClient<HttpTransport>> {
        let settings = self.store().load().context("Failed to read settings")?;
        if !settings.has_credentials() {
            anyhow::bail!("Not logged in. Run 'kosync login' first.");
        }
        let transport = self.transport(&settings.server_url)?;
        Ok(KoSyncClient::new(
            ClientConfig::from_settings(&settings),
            transport,
        ))
    }
}
