//! Relay envelope - the wrapper used when the sync server is not directly
//! reachable from the client.
//!
//! The client POSTs one envelope per logical request to a same-origin relay
//! endpoint; the relay performs the real request and mirrors status and body.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::SyncError;

/// HTTP methods used by the sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Read (auth check, progress fetch)
    Get,
    /// Create (registration, relay envelope)
    Post,
    /// Overwrite (progress push)
    Put,
}

impl HttpMethod {
    /// Canonical uppercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for HttpMethod {
    type Error = SyncError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            _ => Err(SyncError::UnsupportedMethod(value.to_string())),
        }
    }
}

/// One relayed request.
///
/// `server_url` and `endpoint` are optional on the wire so the relay can
/// reject incomplete envelopes with a 400 instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEnvelope {
    /// Base URL of the target sync server, without trailing slash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    /// Path on the target server (e.g. `/syncs/progress`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Method to use against the target
    #[serde(default = "default_method")]
    pub method: HttpMethod,
    /// Headers to forward (auth headers live here)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON body to forward
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

fn default_method() -> HttpMethod {
    HttpMethod::Get
}

impl RelayEnvelope {
    /// Create an envelope for a request against `server_url`.
    ///
    /// One trailing slash is stripped from the server URL.
    pub fn new(
        server_url: &str,
        endpoint: &str,
        method: HttpMethod,
        headers: BTreeMap<String, String>,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self {
            server_url: Some(strip_trailing_slash(server_url).to_string()),
            endpoint: Some(endpoint.to_string()),
            method,
            headers,
            body,
        }
    }

    /// The full URL the relay should call, if the envelope is complete.
    pub fn target_url(&self) -> Option<String> {
        match (self.server_url.as_deref(), self.endpoint.as_deref()) {
            (Some(server), Some(endpoint)) if !server.is_empty() && !endpoint.is_empty() => {
                Some(format!("{}{}", strip_trailing_slash(server), endpoint))
            }
            _ => None,
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        serde_json::to_vec(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(bytes).map_err(SyncError::Deserialization)
    }
}

/// Error body produced by the relay itself (`400`, `405`, `500`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayErrorBody {
    /// Short error kind
    pub error: String,
    /// Underlying failure, for `500`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl RelayErrorBody {
    /// Error without details.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Error with details.
    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Strip exactly one trailing `/`.
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}
