//! # sync-types
//!
//! Wire format types for the KOReader-compatible reading-progress sync protocol.
//!
//! This crate provides the foundational types used across all kosync crates:
//! - [`DeviceId`], [`DocumentDigest`], [`Userkey`], [`SessionId`] - Identity types
//! - [`RemoteProgress`], [`ProgressUpdate`] - Progress records as the server speaks them
//! - [`RelayEnvelope`] - Wrapper for requests tunnelled through a relay
//! - [`SyncSettings`] - The persisted sync configuration
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod ids;
mod messages;
mod settings;

pub use envelope::{strip_trailing_slash, HttpMethod, RelayEnvelope, RelayErrorBody};
pub use error::SyncError;
pub use ids::{DeviceId, DocumentDigest, SessionId, Userkey};
pub use messages::{ProgressUpdate, RegisterRequest, RemoteProgress, ServerMessage};
pub use settings::{
    default_device_name, device_name_for_os, precision_from_tolerance, tolerance_from_precision,
    ChecksumMethod, SyncSettings, SyncStrategy, DEFAULT_DEVICE_PRODUCT,
    DEFAULT_PERCENTAGE_TOLERANCE, DEFAULT_TOLERANCE_PRECISION,
};

/// Media type every request must accept.
pub const ACCEPT_HEADER: &str = "application/vnd.koreader.v1+json";

/// Header carrying the account name.
pub const AUTH_USER_HEADER: &str = "X-Auth-User";

/// Header carrying the userkey.
pub const AUTH_KEY_HEADER: &str = "X-Auth-Key";

/// Protocol endpoint paths.
pub mod endpoints {
    /// `GET` - validate credentials
    pub const AUTH: &str = "/users/auth";
    /// `POST` - register an account
    pub const CREATE_USER: &str = "/users/create";
    /// `PUT` - store progress
    pub const PROGRESS: &str = "/syncs/progress";

    /// `GET` - fetch progress for one document
    pub fn progress_of(digest: &str) -> String {
        format!("{}/{}", PROGRESS, digest)
    }
}
