//! Relay stage: push the staged file to the object store.
//!
//! # Design
//! - Uploads always start from the first byte; partial remote sessions are
//!   aborted rather than carried across runs.
//! - Only the generation token interrupts a relay. Cancellation is honoured by
//!   the controller once the upload concludes.

use std::path::Path;
use std::time::Instant;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use bolt_events::TransferPhase;
use bolt_transfer_core::{
    ObjectStore, ProgressMeter, RemoteReference, RunGeneration, TransferDescriptor,
    TransferError, TransferResult, UploadSession,
};

use crate::emit::Emitter;
use crate::settings::EngineSettings;

/// Result of one relay run.
#[derive(Debug)]
pub enum RelayOutcome {
    /// The object was committed.
    Completed(RemoteReference),
    /// A newer generation took over; the session was aborted.
    Superseded,
    /// The upload failed; the local file is untouched.
    Failed(TransferError),
}

/// Streams a staged file into the object store for a single run.
pub struct RelayStage<'a> {
    store: &'a dyn ObjectStore,
    emitter: &'a Emitter,
    settings: &'a EngineSettings,
}

impl<'a> RelayStage<'a> {
    /// Bind the stage to its collaborators.
    #[must_use]
    pub const fn new(
        store: &'a dyn ObjectStore,
        emitter: &'a Emitter,
        settings: &'a EngineSettings,
    ) -> Self {
        Self {
            store,
            emitter,
            settings,
        }
    }

    /// Upload `path` as `name` under generation `run`.
    pub async fn run(
        &self,
        descriptor: &TransferDescriptor,
        run: RunGeneration,
        path: &Path,
        name: &str,
    ) -> RelayOutcome {
        let (file, total) = match open_staged(path).await {
            Ok(opened) => opened,
            Err(err) => return RelayOutcome::Failed(err),
        };
        let mut meter = ProgressMeter::new(
            descriptor.id(),
            name,
            TransferPhase::Uploading,
            0,
            total,
            self.settings.progress_interval,
        );
        self.emitter
            .progress(descriptor, meter.snapshot_at(0, Instant::now()));

        let session = match self.store.create(name, total).await {
            Ok(session) => session,
            Err(err) => return RelayOutcome::Failed(err),
        };
        info!(download_id = %descriptor.id(), total, "relay started");
        self.stream(descriptor, run, file, path, session, &mut meter)
            .await
    }

    async fn stream(
        &self,
        descriptor: &TransferDescriptor,
        run: RunGeneration,
        mut file: File,
        path: &Path,
        mut session: Box<dyn UploadSession>,
        meter: &mut ProgressMeter,
    ) -> RelayOutcome {
        let mut buf = vec![0_u8; self.settings.relay_chunk_bytes.max(1)];
        let mut sent = 0_u64;
        loop {
            if !descriptor.is_current(run) || descriptor.is_paused() {
                debug!(download_id = %descriptor.id(), sent, "relay superseded");
                session.abort().await;
                return RelayOutcome::Superseded;
            }
            let filled = match fill(&mut file, &mut buf).await {
                Ok(filled) => filled,
                Err(source) => {
                    session.abort().await;
                    return RelayOutcome::Failed(TransferError::filesystem(
                        "relay.read",
                        path,
                        source,
                    ));
                }
            };
            if filled == 0 {
                break;
            }
            let progress = match session
                .write_chunk(Bytes::copy_from_slice(&buf[..filled]))
                .await
            {
                Ok(progress) => progress,
                Err(err) => {
                    session.abort().await;
                    return RelayOutcome::Failed(err);
                }
            };
            self.emitter.metrics().add_bytes_relayed(filled as u64);
            sent = progress.bytes_sent;
            if let Some(snapshot) = meter.observe(sent) {
                self.emitter.progress(descriptor, snapshot);
            }
        }

        match session.finish().await {
            Ok(reference) => {
                if descriptor.may_continue(run) {
                    self.emitter
                        .progress(descriptor, meter.snapshot_at(sent, Instant::now()));
                }
                RelayOutcome::Completed(reference)
            }
            Err(err) => RelayOutcome::Failed(err),
        }
    }
}

async fn open_staged(path: &Path) -> TransferResult<(File, u64)> {
    let file = File::open(path)
        .await
        .map_err(|source| TransferError::filesystem("relay.open", path, source))?;
    let total = file
        .metadata()
        .await
        .map_err(|source| TransferError::filesystem("relay.metadata", path, source))?
        .len();
    Ok((file, total))
}

/// Read until `buf` is full or the file ends.
async fn fill(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = file.read(&mut buf[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bolt_events::{Event, EventBus};
    use bolt_telemetry::Metrics;
    use bolt_transfer_core::{
        ByteRange, ByteStream, FilenamePolicy, RemoteMetadata, TransferRequest, UploadProgress,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Object store double that keeps committed objects in memory.
    #[derive(Default, Clone)]
    pub(crate) struct MemoryStore {
        pub(crate) objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        pub(crate) aborted: Arc<Mutex<usize>>,
        pub(crate) deleted: Arc<Mutex<Vec<String>>>,
        pub(crate) fail_writes: bool,
    }

    struct MemorySession {
        store: MemoryStore,
        buffer: Vec<u8>,
        total: u64,
    }

    #[async_trait]
    impl UploadSession for MemorySession {
        async fn write_chunk(&mut self, chunk: Bytes) -> TransferResult<UploadProgress> {
            if self.store.fail_writes {
                return Err(TransferError::remote_store(
                    "memory.write",
                    std::io::Error::other("quota exceeded"),
                ));
            }
            self.buffer.extend_from_slice(&chunk);
            Ok(UploadProgress {
                bytes_sent: self.buffer.len() as u64,
                total_bytes: self.total,
            })
        }

        async fn finish(self: Box<Self>) -> TransferResult<RemoteReference> {
            let Self { store, buffer, .. } = *self;
            let mut objects = store.objects.lock().expect("lock");
            let id = format!("obj-{}", objects.len() + 1);
            objects.insert(id.clone(), buffer);
            Ok(RemoteReference {
                share_link: Some(format!("memory://{id}")),
                id,
            })
        }

        async fn abort(self: Box<Self>) {
            *self.store.aborted.lock().expect("lock") += 1;
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        fn is_durable(&self) -> bool {
            true
        }

        async fn create(
            &self,
            _name: &str,
            total_bytes: u64,
        ) -> TransferResult<Box<dyn UploadSession>> {
            Ok(Box::new(MemorySession {
                store: self.clone(),
                buffer: Vec::new(),
                total: total_bytes,
            }))
        }

        async fn delete(&self, id: &str) -> TransferResult<bool> {
            self.deleted.lock().expect("lock").push(id.to_string());
            Ok(self.objects.lock().expect("lock").remove(id).is_some())
        }

        async fn metadata(&self, id: &str) -> TransferResult<RemoteMetadata> {
            let objects = self.objects.lock().expect("lock");
            let object = objects.get(id).ok_or_else(|| TransferError::RemoteNotFound {
                id: id.to_string(),
            })?;
            Ok(RemoteMetadata {
                name: id.to_string(),
                size: object.len() as u64,
                mime_type: "application/octet-stream".into(),
            })
        }

        async fn read(&self, id: &str, _range: Option<ByteRange>) -> TransferResult<ByteStream> {
            Err(TransferError::RemoteNotFound { id: id.to_string() })
        }
    }

    fn descriptor() -> TransferDescriptor {
        TransferDescriptor::new(TransferRequest {
            source: "https://x/y.bin".into(),
            filename_policy: FilenamePolicy::DeriveFromSource,
        })
    }

    fn small_chunks() -> EngineSettings {
        EngineSettings {
            relay_chunk_bytes: 64,
            ..EngineSettings::default()
        }
    }

    #[tokio::test]
    async fn uploads_whole_file_and_reports_uploading_phase() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("y.bin");
        let body: Vec<u8> = (0..300_u32).map(|n| (n % 7) as u8).collect();
        tokio::fs::write(&path, &body).await.expect("seed");
        let store = MemoryStore::default();
        let bus = EventBus::new();
        let emitter = Emitter::new(bus.clone(), Metrics::new().expect("metrics"));
        let settings = small_chunks();
        let descriptor = descriptor();
        let run = descriptor.current_generation();

        let outcome = RelayStage::new(&store, &emitter, &settings)
            .run(&descriptor, run, &path, "y.bin")
            .await;
        let RelayOutcome::Completed(reference) = outcome else {
            panic!("relay did not complete");
        };
        assert_eq!(
            store.objects.lock().expect("lock").get(&reference.id),
            Some(&body)
        );

        let snapshots: Vec<_> = bus
            .backlog_since(0)
            .into_iter()
            .filter_map(|env| match env.event {
                Event::DownloadProgress(payload) => Some(payload),
                _ => None,
            })
            .collect();
        let first = snapshots.first().expect("upload start snapshot");
        assert_eq!(first.phase, TransferPhase::Uploading);
        assert_eq!(first.downloaded, 0);
        assert_eq!(snapshots.last().expect("final").downloaded, 300);
    }

    #[tokio::test]
    async fn store_failure_keeps_local_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("y.bin");
        tokio::fs::write(&path, vec![1_u8; 100]).await.expect("seed");
        let store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let emitter = Emitter::new(EventBus::new(), Metrics::new().expect("metrics"));
        let settings = small_chunks();
        let descriptor = descriptor();
        let run = descriptor.current_generation();

        let outcome = RelayStage::new(&store, &emitter, &settings)
            .run(&descriptor, run, &path, "y.bin")
            .await;
        assert!(matches!(
            outcome,
            RelayOutcome::Failed(TransferError::RemoteStore { .. })
        ));
        assert_eq!(*store.aborted.lock().expect("lock"), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn paused_relay_aborts_the_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("y.bin");
        tokio::fs::write(&path, vec![1_u8; 100]).await.expect("seed");
        let store = MemoryStore::default();
        let emitter = Emitter::new(EventBus::new(), Metrics::new().expect("metrics"));
        let settings = small_chunks();
        let descriptor = descriptor();
        let run = descriptor.current_generation();
        assert!(descriptor.pause());

        let outcome = RelayStage::new(&store, &emitter, &settings)
            .run(&descriptor, run, &path, "y.bin")
            .await;
        assert!(matches!(outcome, RelayOutcome::Superseded));
        assert_eq!(*store.aborted.lock().expect("lock"), 1);
        assert!(store.objects.lock().expect("lock").is_empty());
    }
}
