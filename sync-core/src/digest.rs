//! Document digests for kosync.
//!
//! The server keys progress by a per-document digest, computed one of two ways:
//! - **binary**: KOReader's partial MD5 over sampled 1 KiB blocks of the file
//! - **filename**: MD5 of the base filename with its last extension removed
//!
//! Both sides of a sync must use the same method, otherwise they talk about
//! different documents. Switching methods needs no migration; every push simply
//! uses whichever method is configured at the time.

use std::io::{self, Read, Seek, SeekFrom};
use sync_types::{ChecksumMethod, DocumentDigest};

/// Size of one partial-MD5 sample.
pub const SAMPLE_SIZE: u64 = 1024;

/// Number of shifted sample offsets after the leading one at 0.
const SAMPLE_STEPS: u32 = 11;

/// What the host knows about a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentIdentity {
    /// Precomputed partial MD5 of the content, if the host has one
    pub content_hash: Option<String>,
    /// Original file name or path the document was imported from
    pub source_title: Option<String>,
    /// Display title
    pub title: String,
}

impl DocumentIdentity {
    /// Identity with only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Attach a precomputed content hash.
    pub fn with_content_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }

    /// Attach the source file name.
    pub fn with_source_title(mut self, source: impl Into<String>) -> Self {
        self.source_title = Some(source.into());
        self
    }
}

/// Derive the server-side key for a document.
///
/// Returns `None` when no digest can be derived (no content hash under
/// `binary`), in which case sync is inactive for the document.
pub fn document_digest(
    identity: &DocumentIdentity,
    method: ChecksumMethod,
) -> Option<DocumentDigest> {
    match method {
        ChecksumMethod::Binary => identity
            .content_hash
            .clone()
            .and_then(DocumentDigest::from_hex),
        ChecksumMethod::Filename => {
            let name = identity
                .source_title
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or(&identity.title);
            Some(DocumentDigest::of_bytes(filename_stem(name).as_bytes()))
        }
    }
}

/// Normalize a file name for the `filename` method.
///
/// Backslashes become slashes, the last path segment is taken and its final
/// extension dropped. When that leaves nothing (no dot at all, or a dotfile),
/// the whole normalized path is used instead.
pub fn filename_stem(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    let base = normalized.rsplit('/').next().unwrap_or("");
    match base.rfind('.') {
        Some(dot) if dot > 0 => base[..dot].to_string(),
        _ => normalized,
    }
}

/// Byte offsets sampled by the partial MD5: `0`, then `1024 << 2i` for `i` in `0..=10`.
pub fn sample_offsets() -> impl Iterator<Item = u64> {
    std::iter::once(0).chain((0..SAMPLE_STEPS).map(|i| SAMPLE_SIZE << (2 * i)))
}

/// Partial MD5 of an in-memory document.
pub fn partial_md5(content: &[u8]) -> DocumentDigest {
    let mut ctx = md5::Context::new();
    let len = content.len() as u64;
    for offset in sample_offsets() {
        if offset >= len {
            break;
        }
        let start = offset as usize;
        let end = (offset + SAMPLE_SIZE).min(len) as usize;
        ctx.consume(&content[start..end]);
    }
    DocumentDigest::from_md5_digest(ctx.compute())
}

/// Partial MD5 of a seekable source, reading at most twelve samples.
pub fn partial_md5_reader<R: Read + Seek>(reader: &mut R) -> io::Result<DocumentDigest> {
    let mut ctx = md5::Context::new();
    let mut sample = Vec::with_capacity(SAMPLE_SIZE as usize);
    for offset in sample_offsets() {
        reader.seek(SeekFrom::Start(offset))?;
        sample.clear();
        reader.by_ref().take(SAMPLE_SIZE).read_to_end(&mut sample)?;
        if sample.is_empty() {
            break;
        }
        ctx.consume(&sample);
    }
    Ok(DocumentDigest::from_md5_digest(ctx.compute()))
}
