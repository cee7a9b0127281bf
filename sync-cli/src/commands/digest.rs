//! Compute document digests.

use anyhow::{Context, Result};
use std::path::Path;
use sync_client::SettingsStore;
use sync_core::{document_digest, partial_md5_reader, DocumentIdentity};
use sync_types::{ChecksumMethod, DocumentDigest};

use super::CliContext;

/// Describe a file the way a reader would.
///
/// The file content is only read under the `binary` method.
pub async fn identify(path: &Path, method: ChecksumMethod) -> Result<DocumentIdentity> {
    let title = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let identity =
        DocumentIdentity::titled(title).with_source_title(path.to_string_lossy().into_owned());

    if method == ChecksumMethod::Filename {
        return Ok(identity);
    }

    let owned = path.to_path_buf();
    let hash = tokio::task::spawn_blocking(move || {
        let mut file = std::fs::File::open(&owned)?;
        partial_md5_reader(&mut file)
    })
    .await
    .context("Digest task failed")?
    .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(identity.with_content_hash(hash.to_string()))
}

/// Digest of a file under the given method.
pub async fn compute(path: &Path, method: ChecksumMethod) -> Result<DocumentDigest> {
    let identity = identify(path, method).await?;
    document_digest(&identity, method)
        .with_context(|| format!("No digest could be derived for {}", path.display()))
}

/// Run the digest command.
pub async fn run(ctx: &CliContext, path: &Path, method: Option<ChecksumMethod>) -> Result<()> {
    let method = method.unwrap_or_else(|| ctx.store().settings().checksum_method);
    let digest = compute(path, method).await?;
    println!("{digest}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::partial_md5;
    use tempfile::tempdir;

    #[tokio::test]
    async fn binary_digest_samples_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("book.epub");
        let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        let digest = compute(&path, ChecksumMethod::Binary).await.unwrap();
        assert_eq!(digest, partial_md5(&content));
    }

    #[tokio::test]
    async fn filename_digest_ignores_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Dune.epub");

        // The file does not need to exist
        let digest = compute(&path, ChecksumMethod::Filename).await.unwrap();
        assert_eq!(digest, DocumentDigest::of_bytes(b"Dune"));
    }

    #[tokio::test]
    async fn binary_digest_of_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = compute(&dir.path().join("missing.pdf"), ChecksumMethod::Binary).await;

        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to read"), "got: {}", err);
    }

    #[tokio::test]
    async fn identity_carries_file_name_as_title() {
        let identity = identify(Path::new("/books/Dune.epub"), ChecksumMethod::Filename)
            .await
            .unwrap();
        assert_eq!(identity.title, "Dune.epub");
        assert_eq!(identity.source_title.as_deref(), Some("/books/Dune.epub"));
        assert!(identity.content_hash.is_none());
    }
}
