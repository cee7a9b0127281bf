//! # sync-client
//!
//! Client library for KOReader-compatible reading-progress sync.
//!
//! This is the library applications embed to keep reading positions in step
//! across devices through a KOSync server.
//!
//! ## Features
//!
//! - **Protocol client**: login/registration, progress fetch and update
//! - **Transport Abstraction**: direct HTTP, same-origin relay, mock
//! - **Debounced pushes**: single-slot scheduler with explicit flush
//! - **Pure State Machine**: uses sync-core for side-effect-free reconciliation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sync_client::{ClientConfig, HttpTransport, KoSyncClient, SessionOptions, SyncSession};
//!
//! let transport = HttpTransport::for_server(&settings.server_url, None, None)?;
//! let client = Arc::new(KoSyncClient::new(ClientConfig::from_settings(&settings), transport));
//!
//! let session = SyncSession::open(client, document, collaborators, SessionOptions::default());
//! session.reconcile().await;
//!
//! // On every page turn
//! session.progress_changed();
//!
//! // On document close
//! session.close().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod client;
pub mod collab;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use account::{login, logout};
pub use client::{ClientConfig, ClientError, ConnectOutcome, KoSyncClient};
pub use collab::{
    Collaborators, ConfigStore, DocumentState, EventSink, MemorySettingsStore, PageInfo,
    ReaderView, SettingsStore, StoreError, ViewProgress,
};
pub use scheduler::{PushScheduler, DEFAULT_PUSH_DELAY};
pub use session::{SessionOptions, SyncSession};
pub use transport::{
    choose_route, is_lan_address, DirectOptions, HttpRequest, HttpResponse, HttpTransport,
    MockTransport, RelayTransport, ReqwestTransport, Route, Transport, TransportError,
};
