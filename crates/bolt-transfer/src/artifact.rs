//! Local staging directory access.
//!
//! # Design
//! - Artifact names are single path segments; anything that could escape the
//!   staging root is rejected before touching the filesystem.
//! - Reads are streamed in bounded chunks so large media files never sit in memory.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use async_trait::async_trait;
use bolt_transfer_core::{ArtifactReader, ByteRange, ByteStream, TransferError, TransferResult};

/// Read size used when streaming artifacts back to clients.
pub const STREAM_CHUNK_BYTES: usize = 1024 * 1024;

/// Reject names that are not a single safe path segment.
///
/// # Errors
///
/// Returns [`TransferError::InvalidInput`] for empty names or names containing
/// `..`, `/`, or `\`.
pub fn validate_artifact_name(name: &str) -> TransferResult<()> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains("..") || name.contains('/') || name.contains('\\') {
        Some("must be a single path segment")
    } else {
        None
    };
    reason.map_or(Ok(()), |reason| {
        Err(TransferError::InvalidInput {
            field: "filename",
            reason,
            value: Some(name.to_string()),
        })
    })
}

/// Staging directory holding fetched artifacts.
#[derive(Debug, Clone)]
pub struct LocalArtifacts {
    root: PathBuf,
}

impl LocalArtifacts {
    /// Wrap a staging directory; it is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Staging root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the staging root if missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub async fn ensure_root(&self) -> TransferResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| TransferError::filesystem("artifact.ensure_root", &self.root, source))
    }

    /// Path of the artifact called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error when `name` is not a safe path segment.
    pub fn path_for(&self, name: &str) -> TransferResult<PathBuf> {
        validate_artifact_name(name)?;
        Ok(self.root.join(name))
    }

    /// Size of the artifact, or `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or unreadable metadata.
    pub async fn size(&self, name: &str) -> TransferResult<Option<u64>> {
        let path = self.path_for(name)?;
        file_size(&path).await
    }

    /// Delete the artifact. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or when removal fails for a reason
    /// other than the file being absent.
    pub async fn remove(&self, name: &str) -> TransferResult<bool> {
        let path = self.path_for(name)?;
        remove_file(&path).await
    }

    /// Stream the artifact, optionally limited to `range`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or when the file cannot be opened.
    pub async fn read(&self, name: &str, range: Option<ByteRange>) -> TransferResult<ByteStream> {
        let path = self.path_for(name)?;
        stream_file(path, range, STREAM_CHUNK_BYTES).await
    }
}

#[async_trait]
impl ArtifactReader for LocalArtifacts {
    async fn size(&self, name: &str) -> TransferResult<Option<u64>> {
        Self::size(self, name).await
    }

    async fn read(&self, name: &str, range: Option<ByteRange>) -> TransferResult<ByteStream> {
        Self::read(self, name, range).await
    }
}

/// Size of the file at `path`, or `None` when absent.
pub(crate) async fn file_size(path: &Path) -> TransferResult<Option<u64>> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(TransferError::filesystem("artifact.metadata", path, source)),
    }
}

/// Remove the file at `path`, treating absence as success.
pub(crate) async fn remove_file(path: &Path) -> TransferResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(TransferError::filesystem("artifact.remove", path, source)),
    }
}

/// Stream `path` in `chunk_bytes` reads, restricted to `range` when given.
pub(crate) async fn stream_file(
    path: PathBuf,
    range: Option<ByteRange>,
    chunk_bytes: usize,
) -> TransferResult<ByteStream> {
    let mut file = fs::File::open(&path)
        .await
        .map_err(|source| TransferError::filesystem("artifact.open", &path, source))?;
    let (start, limit) = match range {
        Some(range) => (range.start, Some(range.len())),
        None => (0, None),
    };
    if start > 0 {
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|source| TransferError::filesystem("artifact.seek", &path, source))?;
    }

    let stream = async_stream::try_stream! {
        let mut buf = vec![0_u8; chunk_bytes.max(1)];
        let mut remaining = limit;
        loop {
            let want = remaining.map_or(buf.len(), |left| {
                usize::try_from(left).unwrap_or(usize::MAX).min(buf.len())
            });
            if want == 0 {
                break;
            }
            let read = file
                .read(&mut buf[..want])
                .await
                .map_err(|source| TransferError::filesystem("artifact.read", &path, source))?;
            if read == 0 {
                break;
            }
            if let Some(left) = remaining.as_mut() {
                *left -= read as u64;
            }
            yield Bytes::copy_from_slice(&buf[..read]);
        }
    };
    Ok(Box::pin(stream))
}
