//! Log in to a sync server.

use anyhow::{Context, Result};
use sync_client::{ClientConfig, KoSyncClient};
use zeroize::Zeroizing;

use super::CliContext;

/// Run the login command.
pub async fn run(
    ctx: &CliContext,
    server: &str,
    username: &str,
    password: Option<String>,
) -> Result<()> {
    if username.is_empty() {
        anyhow::bail!("Username must not be empty");
    }

    let password = match password {
        Some(password) => Zeroizing::new(password),
        None => Zeroizing::new(
            rpassword::prompt_password("Password: ").context("Failed to read password")?,
        ),
    };

    let store = ctx.store();
    let mut settings = store.load().context("Failed to read settings")?;
    settings.server_url = server.to_string();
    settings.device_id_or_generate();

    let transport = ctx.transport(server)?;
    let mut client = KoSyncClient::new(ClientConfig::from_settings(&settings), transport);

    println!("Connecting to {}...", client.config().server_url);
    let outcome = sync_client::login(&mut client, &store, username, &password)
        .await
        .context("Failed to save settings")?;

    if !outcome.success {
        anyhow::bail!("{}", outcome.message);
    }

    let saved = store.load().context("Failed to read settings")?;
    println!("{}", outcome.message);
    println!();
    println!("  Server:   {}", saved.server_url);
    println!("  Username: {}", saved.username);
    println!("  Strategy: {}", saved.strategy);
    println!("  Settings: {}", store.path().display());

    Ok(())
}
