//! Request and response bodies of the KOReader sync protocol.
//!
//! The server speaks JSON. Every field of a progress response is optional:
//! a document that was never synced comes back without `document`, and
//! third-party servers disagree on whether `timestamp` is an integer.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{DeviceId, DocumentDigest, SyncError};

/// Progress stored on the server for one document.
///
/// `progress` is overloaded: a 1-based page number for fixed-layout
/// documents, an XPointer (or a legacy CFI) for reflowable ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteProgress {
    /// Document digest the record belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    /// Position in wire form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
    /// Completion fraction in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Unix seconds of the last update, as recorded by the server
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<i64>,
    /// Human-readable name of the device that pushed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Stable id of the device that pushed it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl RemoteProgress {
    /// Parse a progress response body.
    pub fn from_json(body: &str) -> Result<Self, SyncError> {
        serde_json::from_str(body).map_err(SyncError::Deserialization)
    }

    /// Whether this is a real record rather than the "never synced" reply.
    pub fn has_document(&self) -> bool {
        self.document.as_deref().is_some_and(|d| !d.is_empty())
    }

    /// Whether the record carries enough to reconcile against:
    /// a non-empty `progress` and a non-zero `timestamp`.
    pub fn is_usable(&self) -> bool {
        self.progress.as_deref().is_some_and(|p| !p.is_empty())
            && self.timestamp.is_some_and(|t| t != 0)
    }

    /// Timestamp converted to milliseconds, the unit of the local clock.
    pub fn timestamp_millis(&self) -> Option<i64> {
        self.timestamp.map(|t| t.saturating_mul(1000))
    }
}

/// Body of `PUT /syncs/progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Document digest
    pub document: DocumentDigest,
    /// Position in wire form
    pub progress: String,
    /// Completion fraction in `[0, 1]`
    pub percentage: f64,
    /// Human-readable device name
    pub device: String,
    /// Stable device id
    pub device_id: DeviceId,
}

/// Body of `POST /users/create`.
///
/// `password` carries the userkey digest, never the raw password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account name
    pub username: String,
    /// MD5 of the raw password
    pub password: String,
}

/// Error body returned by KOSync servers (`{"message": "..."}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Server-provided code, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Server-provided text, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerMessage {
    /// Extract the message from a body, tolerating non-JSON bodies.
    pub fn message_of(body: &str) -> Option<String> {
        serde_json::from_str::<ServerMessage>(body)
            .ok()
            .and_then(|m| m.message)
            .filter(|m| !m.is_empty())
    }
}

/// Accept integer or floating-point seconds.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(value.and_then(|n| n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))))
}
