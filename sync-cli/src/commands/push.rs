//! Store progress on the server.

use anyhow::{Context, Result};
use std::path::Path;
use sync_client::{KoSyncClient, Transport};
use sync_core::{encode, DocumentIdentity, Position, WireProgress};

use super::{digest, CliContext};

/// Position to push, as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum PushTarget {
    /// 1-based page of a fixed-layout document.
    Page {
        /// Page number
        page: u32,
        /// Page count
        total: u32,
    },
    /// Pointer of a reflowable document, sent as given.
    Pointer {
        /// Wire pointer
        pointer: String,
        /// Completion fraction
        percentage: f64,
    },
}

impl PushTarget {
    /// Wire form of the target.
    pub fn wire(&self) -> Result<WireProgress> {
        match self {
            PushTarget::Page { page, total } => {
                if *page == 0 || page > total {
                    anyhow::bail!("Page must be between 1 and {total}");
                }
                Ok(encode(&Position::page(page - 1, *total), None).wire)
            }
            PushTarget::Pointer {
                pointer,
                percentage,
            } => {
                if pointer.is_empty() {
                    anyhow::bail!("Pointer must not be empty");
                }
                if !(0.0..=1.0).contains(percentage) {
                    anyhow::bail!("Percentage must be between 0 and 1");
                }
                Ok(WireProgress {
                    progress: pointer.clone(),
                    percentage: *percentage,
                })
            }
        }
    }
}

/// Run the push command.
pub async fn run(ctx: &CliContext, path: &Path, target: PushTarget) -> Result<()> {
    let wire = target.wire()?;
    let client = ctx.client()?;
    let identity = digest::identify(path, client.config().checksum_method).await?;

    send(&client, &identity, &wire).await?;

    println!("Push successful!");
    println!();
    println!("  Document:   {}", identity.title);
    println!("  Position:   {}", wire.progress);
    println!("  Percentage: {:.1}%", wire.percentage * 100.0);
    Ok(())
}

/// Push one wire position for a document.
pub async fn send<T: Transport>(
    client: &KoSyncClient<T>,
    identity: &DocumentIdentity,
    wire: &WireProgress,
) -> Result<()> {
    client
        .push_progress(identity, &wire.progress, wire.percentage)
        .await
        .context("Failed to push progress")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sync_client::{ClientConfig, MockTransport};
    use sync_types::{ChecksumMethod, DeviceId, HttpMethod, Userkey};
    use tempfile::tempdir;

    fn client(transport: MockTransport) -> KoSyncClient<MockTransport> {
        KoSyncClient::new(
            ClientConfig {
                server_url: "https://sync.example.com".into(),
                username: "alice".into(),
                userkey: Some(Userkey::from_password("pw")),
                checksum_method: ChecksumMethod::Filename,
                device_id: DeviceId::from_string("0123456789ABCDEF0123456789ABCDEF"),
                device_name: "Desk".into(),
            },
            transport,
        )
    }

    // ===========================================
    // Target Tests
    // ===========================================

    #[test]
    fn page_target_encodes_page_number() {
        let wire = PushTarget::Page { page: 5, total: 10 }.wire().unwrap();
        assert_eq!(wire.progress, "5");
        assert!((wire.percentage - 0.5).abs() < 1e-12);
    }

    #[test]
    fn page_out_of_range_is_rejected() {
        assert!(PushTarget::Page { page: 0, total: 10 }.wire().is_err());
        assert!(PushTarget::Page { page: 11, total: 10 }.wire().is_err());
    }

    #[test]
    fn pointer_target_is_sent_verbatim() {
        let target = PushTarget::Pointer {
            pointer: "/body/DocFragment[3]/body/p[2]/text().0".into(),
            percentage: 0.25,
        };
        let wire = target.wire().unwrap();
        assert_eq!(wire.progress, "/body/DocFragment[3]/body/p[2]/text().0");
        assert_eq!(wire.percentage, 0.25);

        let bad = PushTarget::Pointer {
            pointer: "/body".into(),
            percentage: 1.5,
        };
        assert!(bad.wire().is_err());
    }

    // ===========================================
    // Send Tests
    // ===========================================

    #[tokio::test]
    async fn send_puts_progress() {
        let transport = MockTransport::new();
        transport.queue_json(200, json!({"document": "x", "timestamp": 1}));
        let client = client(transport.clone());
        let wire = PushTarget::Page { page: 3, total: 4 }.wire().unwrap();

        send(&client, &DocumentIdentity::titled("scan.pdf"), &wire)
            .await
            .unwrap();

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(sent.endpoint, "/syncs/progress");
        let body = sent.body.unwrap();
        assert_eq!(body["progress"], "3");
        assert_eq!(body["percentage"], 0.75);
        assert_eq!(body["device"], "Desk");
        assert_eq!(body["device_id"], "0123456789ABCDEF0123456789ABCDEF");
    }

    #[tokio::test]
    async fn send_failure_is_error() {
        let transport = MockTransport::new();
        transport.queue_status(401);
        let client = client(transport);
        let wire = PushTarget::Page { page: 1, total: 1 }.wire().unwrap();

        let result = send(&client, &DocumentIdentity::titled("scan.pdf"), &wire).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn push_requires_login() {
        let dir = tempdir().unwrap();
        let ctx = CliContext::new(dir.path().to_path_buf(), None);

        let err = run(&ctx, Path::new("scan.pdf"), PushTarget::Page { page: 1, total: 2 })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not logged in"), "got: {}", err);
    }
}
