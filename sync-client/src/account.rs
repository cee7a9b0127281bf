//! Login and logout against persisted settings.

use crate::client::{ConnectOutcome, KoSyncClient};
use crate::collab::{SettingsStore, StoreError};
use crate::transport::Transport;

/// Connect with the given credentials and persist them on success.
///
/// Persists server URL, username, userkey and device id; a user-chosen device
/// name is kept. A disabled strategy becomes `prompt`. Nothing is written when the server
/// rejects the credentials.
pub async fn login<T: Transport>(
    client: &mut KoSyncClient<T>,
    store: &dyn SettingsStore,
    username: &str,
    password: &str,
) -> Result<ConnectOutcome, StoreError> {
    let outcome = client.connect(username, password).await;
    if !outcome.success {
        return Ok(outcome);
    }

    let config = client.config();
    let Some(userkey) = config.userkey.clone() else {
        return Ok(outcome);
    };

    let mut settings = store.settings();
    settings.apply_login(
        &config.server_url,
        username,
        userkey,
        config.device_id.clone(),
        None,
    );
    store.save(&settings)?;
    Ok(outcome)
}

/// Forget the credential and disable sync.
pub fn logout(store: &dyn SettingsStore) -> Result<(), StoreError> {
    let mut settings = store.settings();
    settings.apply_logout();
    store.save(&settings)?;
    tracing::info!(username = %settings.username, "logged out");
    Ok(())
}
