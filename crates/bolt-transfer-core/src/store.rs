//! Remote object store collaborator.
//!
//! Uploads are session based so the relay stage can stream bounded chunks and
//! observe interruption between them. Whatever progress shape the concrete
//! client reports is adapted into [`UploadProgress`] at this boundary.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransferResult;
use crate::model::{RemoteMetadata, RemoteReference, UploadProgress};
use crate::range::ByteRange;
use crate::source::ByteStream;

/// In-progress upload of a single object.
#[async_trait]
pub trait UploadSession: Send {
    /// Append a chunk and report cumulative progress.
    async fn write_chunk(&mut self, chunk: Bytes) -> TransferResult<UploadProgress>;

    /// Commit the object and return its reference.
    async fn finish(self: Box<Self>) -> TransferResult<RemoteReference>;

    /// Discard everything written so far.
    async fn abort(self: Box<Self>);
}

/// Remote store the relay stage pushes completed artifacts into.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether stored objects survive independently of the local staging copy.
    fn is_durable(&self) -> bool;

    /// Open an upload session for an object named `name` of `total_bytes` bytes.
    async fn create(&self, name: &str, total_bytes: u64) -> TransferResult<Box<dyn UploadSession>>;

    /// Delete an object. Returns `false` when it did not exist.
    async fn delete(&self, id: &str) -> TransferResult<bool>;

    /// Describe an object.
    async fn metadata(&self, id: &str) -> TransferResult<RemoteMetadata>;

    /// Stream an object, optionally restricted to `range`.
    async fn read(&self, id: &str, range: Option<ByteRange>) -> TransferResult<ByteStream>;
}

/// Read access to locally staged artifacts, addressed by name.
#[async_trait]
pub trait ArtifactReader: Send + Sync {
    /// Size of the artifact, or `None` when it does not exist.
    async fn size(&self, name: &str) -> TransferResult<Option<u64>>;

    /// Stream the artifact, optionally restricted to `range`.
    async fn read(&self, name: &str, range: Option<ByteRange>) -> TransferResult<ByteStream>;
}
