//! KoSyncClient - the protocol-level interface for kosync.
//!
//! This module provides [`KoSyncClient`], which speaks the KOReader sync REST
//! protocol over any [`Transport`].
//!
//! # Architecture
//!
//! ```text
//! SyncSession → KoSyncClient → Transport → (relay) → sync server
//!                    ↓
//!              sync-core (digests)
//! ```
//!
//! Two API layers are offered. The `fetch_progress`/`push_progress` pair
//! returns typed errors. The `get_progress`/`update_progress` pair logs and
//! collapses every failure into `None`/`false`, which is what callers that
//! treat sync as best-effort want.
//!
//! # Example
//!
//! ```ignore
//! use sync_client::{ClientConfig, HttpTransport, KoSyncClient};
//!
//! let transport = HttpTransport::for_server(&settings.server_url, None, None)?;
//! let mut client = KoSyncClient::new(ClientConfig::from_settings(&settings), transport);
//!
//! let outcome = client.connect("alice", "secret").await;
//! let remote = client.get_progress(&document).await;
//! ```

use sync_core::{document_digest, DocumentIdentity};
use sync_types::{
    endpoints, strip_trailing_slash, ChecksumMethod, DeviceId, DocumentDigest, HttpMethod,
    ProgressUpdate, RegisterRequest, RemoteProgress, ServerMessage, SyncError, SyncSettings,
    Userkey, AUTH_KEY_HEADER, AUTH_USER_HEADER,
};
use thiserror::Error;

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("server returned status {status}")]
    Status {
        /// HTTP status
        status: u16,
        /// Server-provided message, if any
        message: Option<String>,
    },

    /// The response body could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] SyncError),

    /// No username or userkey configured.
    #[error("missing credentials")]
    MissingCredentials,

    /// No digest could be derived for the document.
    #[error("missing document digest")]
    MissingDigest,
}

/// Result of [`KoSyncClient::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// Whether the credentials are now valid on the server
    pub success: bool,
    /// User-facing message
    pub message: String,
}

impl ConnectOutcome {
    fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Configuration for KoSyncClient.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the sync server, without trailing slash
    pub server_url: String,
    /// Account name
    pub username: String,
    /// Credential digest
    pub userkey: Option<Userkey>,
    /// Digest derivation
    pub checksum_method: ChecksumMethod,
    /// Stable device id sent with pushes
    pub device_id: DeviceId,
    /// Human-readable device name sent with pushes
    pub device_name: String,
}

impl ClientConfig {
    /// Build a configuration from the persisted settings.
    ///
    /// A device id is generated when the settings have none; callers that
    /// persist settings should store it via [`SyncSettings::device_id_or_generate`] first.
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            server_url: strip_trailing_slash(&settings.server_url).to_string(),
            username: settings.username.clone(),
            userkey: settings.userkey.clone(),
            checksum_method: settings.checksum_method,
            device_id: settings.device_id.clone().unwrap_or_else(DeviceId::random),
            device_name: settings.effective_device_name(),
        }
    }

    /// Username and a non-empty userkey are both present.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && self.userkey.as_ref().is_some_and(|k| !k.is_empty())
    }
}

/// The KOReader sync protocol client.
pub struct KoSyncClient<T: Transport> {
    config: ClientConfig,
    transport: T,
}

impl<T: Transport> KoSyncClient<T> {
    /// Create a new KoSyncClient.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.config.has_credentials()
    }

    /// Digest of a document under the configured method.
    pub fn digest(&self, document: &DocumentIdentity) -> Option<DocumentDigest> {
        document_digest(document, self.config.checksum_method)
    }

    fn authed(&self, request: HttpRequest) -> HttpRequest {
        let key = self
            .config
            .userkey
            .as_ref()
            .map(|k| k.as_str().to_string())
            .unwrap_or_default();
        request
            .header(AUTH_USER_HEADER, self.config.username.clone())
            .header(AUTH_KEY_HEADER, key)
    }

    /// Validate credentials, registering the account on first use.
    ///
    /// On success the credential pair becomes the one used by all later calls.
    /// Failures are reported in the outcome, never as errors.
    pub async fn connect(&mut self, username: &str, password: &str) -> ConnectOutcome {
        let userkey = Userkey::from_password(password);
        let outcome = self.authorize_or_register(username, &userkey).await;
        if outcome.success {
            self.config.username = username.to_string();
            self.config.userkey = Some(userkey);
            tracing::info!(username, message = %outcome.message, "sync login succeeded");
        } else {
            tracing::warn!(username, message = %outcome.message, "sync login failed");
        }
        outcome
    }

    async fn authorize_or_register(&self, username: &str, userkey: &Userkey) -> ConnectOutcome {
        let auth = HttpRequest::get(endpoints::AUTH)
            .header(AUTH_USER_HEADER, username)
            .header(AUTH_KEY_HEADER, userkey.as_str());
        let response = match self.transport.execute(auth).await {
            Ok(response) => response,
            Err(err) => return transport_failure(err),
        };

        if response.is_success() {
            return ConnectOutcome::ok("Login successful.");
        }

        if response.status != 401 {
            return ConnectOutcome::failed(
                ServerMessage::message_of(&response.body).unwrap_or_else(|| {
                    format!("Authorization failed with status: {}", response.status)
                }),
            );
        }

        tracing::debug!(username, "auth rejected, attempting registration");
        let register = RegisterRequest {
            username: username.to_string(),
            password: userkey.as_str().to_string(),
        };
        let body = match serde_json::to_value(&register) {
            Ok(body) => body,
            Err(err) => return ConnectOutcome::failed(err.to_string()),
        };
        let response = match self
            .transport
            .execute(HttpRequest::new(HttpMethod::Post, endpoints::CREATE_USER).json(body))
            .await
        {
            Ok(response) => response,
            Err(err) => return transport_failure(err),
        };

        if response.is_success() {
            ConnectOutcome::ok("Registration successful.")
        } else if response.status == 402 {
            ConnectOutcome::failed("Invalid credentials.")
        } else {
            ConnectOutcome::failed(
                ServerMessage::message_of(&response.body)
                    .unwrap_or_else(|| "Registration failed.".to_string()),
            )
        }
    }

    /// Fetch the remote record for a document.
    ///
    /// `Ok(None)` means the server has never seen the document.
    pub async fn fetch_progress(
        &self,
        document: &DocumentIdentity,
    ) -> Result<Option<RemoteProgress>, ClientError> {
        if !self.has_credentials() {
            return Err(ClientError::MissingCredentials);
        }
        let digest = self.digest(document).ok_or(ClientError::MissingDigest)?;

        let request = self.authed(HttpRequest::get(endpoints::progress_of(digest.as_str())));
        let response = self.transport.execute(request).await?;
        check_status(&response)?;

        let record = RemoteProgress::from_json(&response.body)?;
        Ok(record.has_document().then_some(record))
    }

    /// Fetch the remote record, logging failures and returning `None` for them.
    pub async fn get_progress(&self, document: &DocumentIdentity) -> Option<RemoteProgress> {
        match self.fetch_progress(document).await {
            Ok(record) => record,
            Err(ClientError::MissingCredentials | ClientError::MissingDigest) => None,
            Err(err) => {
                tracing::warn!(title = %document.title, error = %err, "failed to get progress");
                None
            }
        }
    }

    /// Store progress for a document.
    pub async fn push_progress(
        &self,
        document: &DocumentIdentity,
        progress: &str,
        percentage: f64,
    ) -> Result<(), ClientError> {
        if !self.has_credentials() {
            return Err(ClientError::MissingCredentials);
        }
        let digest = self.digest(document).ok_or(ClientError::MissingDigest)?;

        let update = ProgressUpdate {
            document: digest,
            progress: progress.to_string(),
            percentage,
            device: self.config.device_name.clone(),
            device_id: self.config.device_id.clone(),
        };
        let body = serde_json::to_value(&update)
            .map_err(|e| ClientError::Serialization(SyncError::Serialization(e)))?;

        let request = self.authed(HttpRequest::new(HttpMethod::Put, endpoints::PROGRESS).json(body));
        let response = self.transport.execute(request).await?;
        check_status(&response)?;

        tracing::debug!(title = %document.title, progress, percentage, "progress pushed");
        Ok(())
    }

    /// Store progress, logging failures and returning whether it succeeded.
    ///
    /// Never retried; the next progress change or document open tries again.
    pub async fn update_progress(
        &self,
        document: &DocumentIdentity,
        progress: &str,
        percentage: f64,
    ) -> bool {
        match self.push_progress(document, progress, percentage).await {
            Ok(()) => true,
            Err(ClientError::MissingCredentials | ClientError::MissingDigest) => false,
            Err(err) => {
                tracing::warn!(title = %document.title, error = %err, "failed to update progress");
                false
            }
        }
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ClientError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(ClientError::Status {
            status: response.status,
            message: ServerMessage::message_of(&response.body),
        })
    }
}

fn transport_failure(err: TransportError) -> ConnectOutcome {
    let message = err.to_string();
    if message.is_empty() {
        ConnectOutcome::failed("Connection error.")
    } else {
        ConnectOutcome::failed(message)
    }
}
