//! Interfaces a host application implements for [`SyncSession`](crate::SyncSession).
//!
//! The session never touches the renderer or storage directly. It asks the
//! [`ReaderView`] where the reader is and where to go, reads per-document
//! state from the [`ConfigStore`], reads and writes the sync settings through
//! the [`SettingsStore`], and reports outcomes on the [`EventSink`].

use std::sync::{Arc, Mutex, PoisonError};

use sync_core::{PointerTranslator, SyncNotice};
use sync_types::SyncSettings;
use thiserror::Error;

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored settings could not be encoded or decoded.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Page information reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// 0-based current page
    pub current: u32,
    /// Page count
    pub total: u32,
}

/// What the renderer currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewProgress {
    /// Page information, when the renderer has paginated
    pub page: Option<PageInfo>,
    /// Title of the current section
    pub section_label: Option<String>,
}

/// Per-document state kept by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    /// Canonical pointer of the last location, for reflowable documents
    pub location: Option<String>,
    /// When the location last changed, in Unix milliseconds
    pub updated_at_ms: i64,
    /// Document format, e.g. `EPUB` or `PDF`
    pub format: String,
}

/// The renderer.
pub trait ReaderView: Send + Sync {
    /// Current position.
    fn progress(&self) -> ViewProgress;

    /// Go to a 0-based page.
    fn go_to_page(&self, index: u32);

    /// Go to a canonical pointer.
    fn go_to_pointer(&self, pointer: &str);

    /// Go to a completion fraction.
    fn go_to_fraction(&self, fraction: f64);

    /// Pointer translation for the currently rendered content, if available.
    fn translator(&self) -> Option<&dyn PointerTranslator>;
}

/// Per-document configuration.
pub trait ConfigStore: Send + Sync {
    /// State of the open document.
    fn document_state(&self) -> DocumentState;
}

/// Sync settings persistence.
pub trait SettingsStore: Send + Sync {
    /// Current settings.
    fn settings(&self) -> SyncSettings;

    /// Persist new settings.
    fn save(&self, settings: &SyncSettings) -> Result<(), StoreError>;
}

/// Receiver of user-visible sync notices.
pub trait EventSink: Send + Sync {
    /// Deliver one notice.
    fn emit(&self, notice: SyncNotice);
}

/// Everything a session talks to besides the server.
#[derive(Clone)]
pub struct Collaborators {
    /// Renderer
    pub view: Arc<dyn ReaderView>,
    /// Document state
    pub config: Arc<dyn ConfigStore>,
    /// Sync settings
    pub settings: Arc<dyn SettingsStore>,
    /// Notices
    pub events: Arc<dyn EventSink>,
}

/// Settings held in memory only.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<SyncSettings>,
}

impl MemorySettingsStore {
    /// Start from the given settings.
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn settings(&self) -> SyncSettings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, settings: &SyncSettings) -> Result<(), StoreError> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::SyncStrategy;

    #[test]
    fn memory_store_round_trips() {
        let store = MemorySettingsStore::default();
        assert_eq!(store.settings().strategy, SyncStrategy::Disabled);

        let mut settings = store.settings();
        settings.strategy = SyncStrategy::Silent;
        store.save(&settings).unwrap();

        assert_eq!(store.settings().strategy, SyncStrategy::Silent);
    }
}
