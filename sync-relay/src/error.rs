//! Error types for sync-relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sync_types::RelayErrorBody;

/// Main error type for sync-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The outbound HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a relayed request was not mirrored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProxyError {
    /// Anything but POST.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Envelope missing `serverUrl` or `endpoint`, or not an envelope at all.
    #[error("serverUrl and endpoint are required")]
    IncompleteEnvelope,

    /// The upstream request failed.
    #[error("Proxy request failed: {0}")]
    Upstream(String),

    /// The upstream answered with something other than JSON.
    #[error("Proxy request failed: Invalid sync server response: Unexpected Content-Type.")]
    UnexpectedContentType,
}

impl ProxyError {
    /// Status the relay answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::IncompleteEnvelope => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::UnexpectedContentType => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body the relay answers with.
    pub fn body(&self) -> RelayErrorBody {
        match self {
            ProxyError::MethodNotAllowed | ProxyError::IncompleteEnvelope => {
                RelayErrorBody::new(self.to_string())
            }
            ProxyError::Upstream(details) => {
                RelayErrorBody::with_details("Proxy request failed", details.clone())
            }
            ProxyError::UnexpectedContentType => RelayErrorBody::with_details(
                "Proxy request failed",
                "Invalid sync server response: Unexpected Content-Type.",
            ),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
