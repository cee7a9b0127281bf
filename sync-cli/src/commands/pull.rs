//! Show the progress stored on the server.

use anyhow::{Context, Result};
use std::path::Path;
use sync_client::{KoSyncClient, Transport};
use sync_core::DocumentIdentity;
use sync_types::RemoteProgress;

use super::{digest, CliContext};

/// Run the pull command.
pub async fn run(ctx: &CliContext, path: &Path) -> Result<()> {
    let client = ctx.client()?;
    let identity = digest::identify(path, client.config().checksum_method).await?;
    print!("{}", report(&client, &identity).await?);
    Ok(())
}

/// Fetch the record for a document and describe it.
pub async fn report<T: Transport>(
    client: &KoSyncClient<T>,
    identity: &DocumentIdentity,
) -> Result<String> {
    let record = client
        .fetch_progress(identity)
        .await
        .context("Failed to fetch progress")?;

    Ok(match record {
        Some(record) if record.is_usable() => describe(&identity.title, &record),
        _ => format!("No progress stored for {}.\n", identity.title),
    })
}

fn describe(title: &str, record: &RemoteProgress) -> String {
    let mut out = format!("Progress for {title}:\n");
    out.push_str(&format!(
        "  Position:   {}\n",
        record.progress.as_deref().unwrap_or_default()
    ));
    if let Some(percentage) = record.percentage {
        out.push_str(&format!("  Percentage: {:.1}%\n", percentage * 100.0));
    }
    if let Some(device) = &record.device {
        out.push_str(&format!("  Device:     {device}\n"));
    }
    if let Some(timestamp) = record.timestamp {
        out.push_str(&format!("  Updated:    {}\n", format_age(timestamp)));
    }
    out
}

/// Format a Unix timestamp relative to now.
fn format_age(ts: i64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(ts);

    let diff = now.saturating_sub(ts).max(0);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sync_client::{ClientConfig, MockTransport};
    use sync_types::{ChecksumMethod, DeviceId, Userkey};
    use tempfile::tempdir;

    fn client(transport: MockTransport) -> KoSyncClient<MockTransport> {
        KoSyncClient::new(
            ClientConfig {
                server_url: "https://sync.example.com".into(),
                username: "alice".into(),
                userkey: Some(Userkey::from_password("pw")),
                checksum_method: ChecksumMethod::Filename,
                device_id: DeviceId::random(),
                device_name: "Desk".into(),
            },
            transport,
        )
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    #[tokio::test]
    async fn report_describes_record() {
        let transport = MockTransport::new();
        transport.queue_json(
            200,
            json!({
                "document": "d41d8cd98f00b204e9800998ecf8427e",
                "progress": "12",
                "percentage": 0.05,
                "timestamp": now() - 7200,
                "device": "Kobo",
                "device_id": "ABC"
            }),
        );
        let client = client(transport.clone());

        let text = report(&client, &DocumentIdentity::titled("scan.pdf"))
            .await
            .unwrap();

        assert!(text.contains("Position:   12"));
        assert!(text.contains("Percentage: 5.0%"));
        assert!(text.contains("Device:     Kobo"));
        assert!(text.contains("2 hours ago"));
        let sent = transport.last_request().unwrap();
        assert!(sent.endpoint.starts_with("/syncs/progress/"));
    }

    #[tokio::test]
    async fn never_synced_document() {
        let transport = MockTransport::new();
        transport.queue_json(200, json!({}));
        let client = client(transport);

        let text = report(&client, &DocumentIdentity::titled("scan.pdf"))
            .await
            .unwrap();
        assert_eq!(text, "No progress stored for scan.pdf.\n");
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let transport = MockTransport::new();
        transport.queue_status(502);
        let client = client(transport);

        let result = report(&client, &DocumentIdentity::titled("scan.pdf")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn pull_requires_login() {
        let dir = tempdir().unwrap();
        let ctx = CliContext::new(dir.path().to_path_buf(), None);

        let err = run(&ctx, Path::new("book.epub")).await.unwrap_err();
        assert!(err.to_string().contains("Not logged in"), "got: {}", err);
    }

    #[test]
    fn format_age_works() {
        let now = now();
        assert_eq!(format_age(now), "just now");
        assert!(format_age(now - 120).contains("minutes"));
        assert!(format_age(now - 172_800).contains("days"));
        // Clock skew never yields a negative age
        assert_eq!(format_age(now + 600), "just now");
    }
}
