//! Filesystem-backed object store.
//!
//! # Design
//! - Objects are addressed by a generated UUID; the caller supplied name only
//!   lives in the JSON manifest stored beside the object.
//! - Uploads land in a hidden temp file and are fsynced and renamed on commit,
//!   so readers never observe a partial object.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use bolt_transfer_core::mime::mime_type_for;
use bolt_transfer_core::{
    ByteRange, ByteStream, ObjectStore, RemoteMetadata, RemoteReference, TransferError,
    TransferResult, UploadProgress, UploadSession,
};

use crate::artifact::{STREAM_CHUNK_BYTES, file_size, remove_file, stream_file};

const MANIFEST_SUFFIX: &str = ".json";

/// Durable object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FilesystemObjectStore {
    root: PathBuf,
}

impl FilesystemObjectStore {
    /// Open the store, creating its root directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the root cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> TransferResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| TransferError::filesystem("store.open", &root, source))?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn manifest_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{id}{MANIFEST_SUFFIX}"))
    }

    async fn load_manifest(&self, id: Uuid) -> TransferResult<RemoteMetadata> {
        let path = self.manifest_path(id);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(TransferError::RemoteNotFound { id: id.to_string() });
            }
            Err(source) => return Err(TransferError::filesystem("store.manifest_read", path, source)),
        };
        serde_json::from_slice(&raw)
            .map_err(|source| TransferError::remote_store("store.manifest_decode", source))
    }
}

/// Only ids this store generated are addressable.
fn parse_id(id: &str) -> TransferResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| TransferError::RemoteNotFound { id: id.to_string() })
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    fn is_durable(&self) -> bool {
        true
    }

    async fn create(&self, name: &str, total_bytes: u64) -> TransferResult<Box<dyn UploadSession>> {
        let id = Uuid::new_v4();
        let temp_path = self.root.join(format!(".tmp.{id}"));
        let file = File::create(&temp_path)
            .await
            .map_err(|source| TransferError::filesystem("store.create", &temp_path, source))?;
        Ok(Box::new(FilesystemUpload {
            id,
            file,
            temp_path,
            final_path: self.object_path(id),
            manifest_path: self.manifest_path(id),
            name: name.to_string(),
            sent: 0,
            total: total_bytes,
        }))
    }

    async fn delete(&self, id: &str) -> TransferResult<bool> {
        let Ok(id) = parse_id(id) else {
            return Ok(false);
        };
        let removed = remove_file(&self.object_path(id)).await?;
        let _ = remove_file(&self.manifest_path(id)).await?;
        debug!(object_id = %id, removed, "object deleted");
        Ok(removed)
    }

    async fn metadata(&self, id: &str) -> TransferResult<RemoteMetadata> {
        let id = parse_id(id)?;
        self.load_manifest(id).await
    }

    async fn read(&self, id: &str, range: Option<ByteRange>) -> TransferResult<ByteStream> {
        let id = parse_id(id)?;
        let path = self.object_path(id);
        if file_size(&path).await?.is_none() {
            return Err(TransferError::RemoteNotFound { id: id.to_string() });
        }
        stream_file(path, range, STREAM_CHUNK_BYTES).await
    }
}

struct FilesystemUpload {
    id: Uuid,
    file: File,
    temp_path: PathBuf,
    final_path: PathBuf,
    manifest_path: PathBuf,
    name: String,
    sent: u64,
    total: u64,
}

#[async_trait]
impl UploadSession for FilesystemUpload {
    async fn write_chunk(&mut self, chunk: Bytes) -> TransferResult<UploadProgress> {
        self.file
            .write_all(&chunk)
            .await
            .map_err(|source| TransferError::filesystem("store.write", &self.temp_path, source))?;
        self.sent += chunk.len() as u64;
        Ok(UploadProgress {
            bytes_sent: self.sent,
            total_bytes: self.total,
        })
    }

    async fn finish(mut self: Box<Self>) -> TransferResult<RemoteReference> {
        self.file
            .flush()
            .await
            .map_err(|source| TransferError::filesystem("store.flush", &self.temp_path, source))?;
        self.file
            .sync_all()
            .await
            .map_err(|source| TransferError::filesystem("store.sync", &self.temp_path, source))?;
        let manifest = RemoteMetadata {
            mime_type: mime_type_for(&self.name).to_string(),
            name: self.name.clone(),
            size: self.sent,
        };
        let encoded = serde_json::to_vec(&manifest)
            .map_err(|source| TransferError::remote_store("store.manifest_encode", source))?;
        fs::write(&self.manifest_path, encoded)
            .await
            .map_err(|source| {
                TransferError::filesystem("store.manifest_write", &self.manifest_path, source)
            })?;
        fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|source| TransferError::filesystem("store.commit", &self.final_path, source))?;
        Ok(RemoteReference {
            id: self.id.to_string(),
            share_link: None,
        })
    }

    async fn abort(self: Box<Self>) {
        let Self {
            file, temp_path, ..
        } = *self;
        drop(file);
        if let Err(err) = fs::remove_file(&temp_path).await {
            debug!(path = %temp_path.display(), error = %err, "failed to remove upload temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    async fn upload(store: &FilesystemObjectStore, name: &str, body: &[u8]) -> RemoteReference {
        let mut session = store
            .create(name, body.len() as u64)
            .await
            .expect("create");
        for chunk in body.chunks(7) {
            session
                .write_chunk(Bytes::copy_from_slice(chunk))
                .await
                .expect("write");
        }
        session.finish().await.expect("finish")
    }

    #[tokio::test]
    async fn committed_objects_can_be_described_and_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FilesystemObjectStore::open(dir.path()).await.expect("open");
        let body = b"hello object store".to_vec();
        let reference = upload(&store, "clip.mp4", &body).await;

        let meta = store.metadata(&reference.id).await.expect("metadata");
        assert_eq!(meta.name, "clip.mp4");
        assert_eq!(meta.size, body.len() as u64);
        assert_eq!(meta.mime_type, "video/mp4");

        let mut stream = store
            .read(&reference.id, Some(ByteRange { start: 6, end: 11 }))
            .await
            .expect("read");
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.expect("chunk"));
        }
        assert_eq!(out, b"object");
    }

    #[tokio::test]
    async fn aborted_uploads_leave_nothing_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FilesystemObjectStore::open(dir.path()).await.expect("open");
        let mut session = store.create("x.bin", 3).await.expect("create");
        session
            .write_chunk(Bytes::from_static(b"abc"))
            .await
            .expect("write");
        session.abort().await;
        let mut entries = fs::read_dir(dir.path()).await.expect("read_dir");
        assert!(entries.next_entry().await.expect("entry").is_none());
    }

    #[tokio::test]
    async fn delete_and_unknown_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FilesystemObjectStore::open(dir.path()).await.expect("open");
        let reference = upload(&store, "a.txt", b"abc").await;
        assert!(store.delete(&reference.id).await.expect("delete"));
        assert!(!store.delete(&reference.id).await.expect("delete twice"));
        assert!(!store.delete("../../etc/passwd").await.expect("bad id"));
        assert!(matches!(
            store.metadata(&reference.id).await,
            Err(TransferError::RemoteNotFound { .. })
        ));
    }
}
