//! Error types for kosync wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding kosync wire data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Unknown HTTP method in a relay envelope
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::UnsupportedMethod("DELETE".into());
        assert_eq!(err.to_string(), "unsupported method: DELETE");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
