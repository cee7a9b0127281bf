//! Settings file for kosync.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sync_client::{SettingsStore, StoreError};
use sync_types::SyncSettings;

/// Name of the settings file inside the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

/// [`SettingsStore`] backed by `<data_dir>/settings.json`.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// Store for the given data directory.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE),
        }
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, defaults when the file does not exist yet.
    pub fn load(&self) -> Result<SyncSettings, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| StoreError::Invalid(e.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(SyncSettings::default()),
            Err(err) => Err(err.into()),
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn settings(&self) -> SyncSettings {
        self.load().unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "unreadable settings, using defaults");
            SyncSettings::default()
        })
    }

    fn save(&self, settings: &SyncSettings) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(settings)
            .map_err(|e| StoreError::Invalid(e.to_string()))?;
        let mut file = open_private(&self.path)?;
        file.write_all(contents.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Open a file for writing with mode 0600 on Unix.
///
/// New files are created owner-only. An existing file is narrowed to 0600
/// before it is truncated, so the contents are never readable by others.
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.set_len(0)?;
    Ok(file)
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
