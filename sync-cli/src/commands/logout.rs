//! Log out.

use anyhow::{Context, Result};

use super::CliContext;

/// Run the logout command.
pub fn run(ctx: &CliContext) -> Result<()> {
    let store = ctx.store();
    let settings = store.load().context("Failed to read settings")?;
    if !settings.has_credentials() {
        println!("Not logged in.");
        return Ok(());
    }

    sync_client::logout(&store).context("Failed to save settings")?;
    println!("Logged out of {}.", settings.server_url);
    println!("Sync is now disabled; run 'kosync login' to enable it again.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_client::SettingsStore;
    use sync_types::{DeviceId, SyncSettings, SyncStrategy, Userkey};
    use tempfile::tempdir;

    #[test]
    fn logout_clears_key_and_disables() {
        let dir = tempdir().unwrap();
        let ctx = CliContext::new(dir.path().to_path_buf(), None);

        let mut settings = SyncSettings {
            strategy: SyncStrategy::Silent,
            ..Default::default()
        };
        settings.apply_login(
            "https://sync.example.com",
            "alice",
            Userkey::from_password("pw"),
            DeviceId::random(),
            None,
        );
        ctx.store().save(&settings).unwrap();

        run(&ctx).unwrap();

        let after = ctx.store().load().unwrap();
        assert!(after.userkey.is_none());
        assert_eq!(after.strategy, SyncStrategy::Disabled);
        assert_eq!(after.username, "alice");
        assert_eq!(after.server_url, "https://sync.example.com");
    }

    #[test]
    fn logout_without_login_is_noop() {
        let dir = tempdir().unwrap();
        let ctx = CliContext::new(dir.path().to_path_buf(), None);

        run(&ctx).unwrap();
        assert!(!ctx.store().path().exists());
    }
}
