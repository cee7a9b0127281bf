//! Show sync status.

use anyhow::{Context, Result};
use sync_types::SyncSettings;

use super::CliContext;

/// Run the status command.
pub fn run(ctx: &CliContext) -> Result<()> {
    let store = ctx.store();
    let settings = store.load().context("Failed to read settings")?;

    println!("=== kosync status ===");
    println!();
    print!("{}", render(&settings));
    println!();
    println!("Settings file: {}", store.path().display());
    Ok(())
}

/// Human-readable summary of the settings.
pub fn render(settings: &SyncSettings) -> String {
    let mut out = String::new();

    if settings.has_credentials() {
        out.push_str("Account:\n");
        out.push_str(&format!("  Server:   {}\n", settings.server_url));
        out.push_str(&format!("  Username: {}\n", settings.username));
    } else {
        out.push_str("Account: NOT LOGGED IN\n");
        if !settings.server_url.is_empty() {
            out.push_str(&format!("  Last server: {}\n", settings.server_url));
        }
    }

    out.push_str("\nDevice:\n");
    match &settings.device_id {
        Some(id) => out.push_str(&format!("  ID:   {id}\n")),
        None => out.push_str("  ID:   (created at first login)\n"),
    }
    out.push_str(&format!("  Name: {}\n", settings.effective_device_name()));

    out.push_str("\nSync:\n");
    out.push_str(&format!("  Strategy:  {}\n", settings.strategy));
    out.push_str(&format!("  Checksum:  {}\n", settings.checksum_method));
    out.push_str(&format!(
        "  Tolerance: {} (precision {})\n",
        settings.percentage_tolerance,
        settings.tolerance_precision()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_client::SettingsStore;
    use sync_types::{DeviceId, SyncStrategy, Userkey};
    use tempfile::tempdir;

    #[test]
    fn status_without_login() {
        let dir = tempdir().unwrap();
        let ctx = CliContext::new(dir.path().to_path_buf(), None);

        // Should succeed but show "not logged in"
        assert!(run(&ctx).is_ok());

        let text = render(&SyncSettings::default());
        assert!(text.contains("NOT LOGGED IN"));
        assert!(text.contains("Strategy:  disabled"));
        assert!(text.contains("precision 4"));
    }

    #[test]
    fn status_with_account() {
        let dir = tempdir().unwrap();
        let ctx = CliContext::new(dir.path().to_path_buf(), None);

        let mut settings = SyncSettings::default();
        settings.apply_login(
            "https://sync.example.com",
            "alice",
            Userkey::from_password("pw"),
            DeviceId::from_string("0123456789ABCDEF0123456789ABCDEF"),
            Some("Desk".into()),
        );
        ctx.store().save(&settings).unwrap();
        assert!(run(&ctx).is_ok());

        let text = render(&settings);
        assert!(text.contains("Username: alice"));
        assert!(text.contains("0123456789ABCDEF0123456789ABCDEF"));
        assert!(text.contains("Name: Desk"));
        assert!(text.contains(&format!("Strategy:  {}", SyncStrategy::Prompt)));
        assert!(!text.contains(Userkey::from_password("pw").as_str()));
    }

    #[test]
    fn corrupt_settings_fail() {
        let dir = tempdir().unwrap();
        let ctx = CliContext::new(dir.path().to_path_buf(), None);
        std::fs::write(ctx.store().path(), "garbage").unwrap();

        assert!(run(&ctx).is_err());
    }
}
