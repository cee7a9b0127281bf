//! Change sync settings.

use anyhow::{Context, Result};
use sync_client::SettingsStore;
use sync_types::{ChecksumMethod, SyncSettings, SyncStrategy};

use super::{status, CliContext};

/// Requested changes; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsChange {
    /// New strategy
    pub strategy: Option<SyncStrategy>,
    /// New checksum method
    pub checksum: Option<ChecksumMethod>,
    /// New tolerance precision
    pub tolerance_precision: Option<u32>,
    /// New device name; empty resets to the platform default
    pub device_name: Option<String>,
}

impl SettingsChange {
    /// Nothing requested.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to a settings record.
    pub fn apply(self, settings: &mut SyncSettings) {
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        if let Some(checksum) = self.checksum {
            settings.checksum_method = checksum;
        }
        if let Some(precision) = self.tolerance_precision {
            settings.set_tolerance_precision(precision);
        }
        if let Some(name) = self.device_name {
            let name = name.trim().to_string();
            settings.device_name = (!name.is_empty()).then_some(name);
        }
    }
}

/// Run the config command. Without changes it only prints the settings.
pub fn run(ctx: &CliContext, change: SettingsChange) -> Result<()> {
    let store = ctx.store();
    let mut settings = store.load().context("Failed to read settings")?;

    if !change.is_empty() {
        change.apply(&mut settings);
        store.save(&settings).context("Failed to save settings")?;
        println!("Settings updated.");
        println!();
    }

    print!("{}", status::render(&settings));
    Ok(())
}
