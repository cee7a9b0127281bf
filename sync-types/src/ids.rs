//! Identity types for kosync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable identifier for one install of the client.
///
/// Generated once as a UUID v4 rendered as 32 uppercase hex digits
/// (no dashes), the form KOReader itself uses for `device_id`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new random DeviceId.
    pub fn random() -> Self {
        Self(
            uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .to_ascii_uppercase(),
        )
    }

    /// Wrap an existing device id (e.g. loaded from settings).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "DeviceId({})", short)
    }
}

/// The server-side key of a document: a lowercase hex MD5 digest.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentDigest(String);

impl DocumentDigest {
    /// MD5 of arbitrary bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::from_md5_digest(md5::compute(bytes))
    }

    /// Render a finished MD5 computation.
    pub fn from_md5_digest(digest: md5::Digest) -> Self {
        Self(format!("{:x}", digest))
    }

    /// Wrap a digest that was computed elsewhere (e.g. a stored content hash).
    ///
    /// Returns `None` for an empty string.
    pub fn from_hex(hex: impl Into<String>) -> Option<Self> {
        let hex = hex.into();
        if hex.is_empty() {
            None
        } else {
            Some(Self(hex))
        }
    }

    /// Get the digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DocumentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentDigest({})", self.0)
    }
}

/// The credential digest sent as `X-Auth-Key` (MD5 of the raw password).
///
/// The raw password never leaves the login path; only this digest is stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Userkey(String);

impl Userkey {
    /// Derive the userkey from a raw password.
    pub fn from_password(password: &str) -> Self {
        Self(format!("{:x}", md5::compute(password.as_bytes())))
    }

    /// Wrap an already-derived userkey.
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty key means "logged out".
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Userkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Userkey([REDACTED])")
    }
}

/// Identifies one document-open lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Create a new random SessionId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}
