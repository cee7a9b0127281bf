//! # sync-relay
//!
//! Same-origin relay for KOReader sync requests.
//!
//! Browser-hosted readers cannot call arbitrary self-hosted sync servers
//! (mixed content, CORS). They POST a relay envelope to this service instead,
//! which performs the real request server-side and mirrors status and body.
//!
//! ## Architecture
//!
//! ```text
//! Reader ──POST envelope──▶ sync-relay ──GET/POST/PUT──▶ KOSync server
//!        ◀──mirrored reply──           ◀──JSON reply───
//! ```
//!
//! ## Endpoints
//!
//! - `POST {relay_path}` (default `/api/kosync`): relay one envelope
//! - `GET /health`: liveness and counters as JSON
//! - `GET /metrics`: Prometheus text format

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod http;
pub mod proxy;
pub mod server;

pub use config::Config;
pub use error::{ProxyError, RelayError};
pub use server::{serve, RelayMetrics, RelayServer};
