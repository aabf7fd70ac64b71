//! Transfer controller: drives one run of fetch then relay for a descriptor.
//!
//! # Design
//! - Each run captures the descriptor generation at launch and stops silently
//!   as soon as it is no longer authoritative.
//! - Cancellation is terminal: a cancelled run removes local and remote copies
//!   and never records history.
//! - Failures are reported once per run, and only when nothing interrupted it.
//! - A relaunched run waits for the previous run of the same descriptor to
//!   exit, so two runs never hold the staging file at once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bolt_events::{CompletePayload, ErrorPayload, Event};
use bolt_telemetry::TransferOutcome;
use bolt_transfer_core::naming::{NamingContext, derive_filename, sanitize_filename};
use bolt_transfer_core::{
    ContentSource, HistoryEntry, HistoryLog, ObjectStore, Registry, RemoteReference,
    RunGeneration, TransferDescriptor, TransferError, TransferResult, TransferState,
};

use crate::artifact::{LocalArtifacts, file_size};
use crate::emit::Emitter;
use crate::fetch::{FetchOutcome, FetchStage};
use crate::relay::{RelayOutcome, RelayStage};
use crate::settings::EngineSettings;

/// How a single run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Both stages finished and history was recorded.
    Completed(HistoryEntry),
    /// A newer generation took over; nothing was reported.
    Superseded,
    /// The transfer was cancelled and its artifacts removed.
    Cancelled,
    /// The run failed; the descriptor stays registered for a later resume.
    Failed,
}

/// Orchestrates fetch and relay runs against shared collaborators.
pub struct TransferController {
    source: Arc<dyn ContentSource>,
    store: Option<Arc<dyn ObjectStore>>,
    registry: Registry,
    history: HistoryLog,
    emitter: Emitter,
    artifacts: LocalArtifacts,
    settings: EngineSettings,
    runs: Mutex<HashMap<Uuid, JoinHandle<RunOutcome>>>,
}

impl TransferController {
    /// Assemble a controller.
    #[must_use]
    pub fn new(
        source: Arc<dyn ContentSource>,
        store: Option<Arc<dyn ObjectStore>>,
        registry: Registry,
        history: HistoryLog,
        emitter: Emitter,
        settings: EngineSettings,
    ) -> Self {
        Self {
            source,
            store,
            registry,
            history,
            emitter,
            artifacts: LocalArtifacts::new(settings.download_dir.clone()),
            settings,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Staging directory access.
    #[must_use]
    pub const fn artifacts(&self) -> &LocalArtifacts {
        &self.artifacts
    }

    /// Launch a run on its own task, chained behind any earlier run of the
    /// same descriptor.
    pub fn spawn(self: &Arc<Self>, descriptor: Arc<TransferDescriptor>, run: RunGeneration) {
        let id = descriptor.id();
        let controller = Arc::clone(self);
        let mut runs = self.lock_runs();
        runs.retain(|_, handle| !handle.is_finished());
        let previous = runs.remove(&id);
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            controller.run(descriptor, run).await
        });
        runs.insert(id, handle);
    }

    /// Wait for the latest run of `id`, if one was launched and not yet reaped.
    pub async fn join(&self, id: Uuid) -> Option<RunOutcome> {
        let handle = self.lock_runs().remove(&id)?;
        handle.await.ok()
    }

    fn lock_runs(&self) -> MutexGuard<'_, HashMap<Uuid, JoinHandle<RunOutcome>>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drive one attempt for `descriptor` under generation `run`.
    pub async fn run(&self, descriptor: Arc<TransferDescriptor>, run: RunGeneration) -> RunOutcome {
        let name = self.resolve_name(&descriptor).await;
        if descriptor.is_cancelled() {
            return self.discard_cancelled(&descriptor, &name, None).await;
        }
        let path = match self.prepare(&name).await {
            Ok(path) => path,
            Err(err) => return self.fail(&descriptor, run, &name, err).await,
        };

        if self.already_staged(&descriptor, &path).await {
            debug!(download_id = %descriptor.id(), "staged artifact reused");
        } else {
            if !descriptor.transition(run, TransferState::Fetching) {
                return self.interrupted(&descriptor, &name, None).await;
            }
            let stage = FetchStage::new(self.source.as_ref(), &self.emitter, &self.settings);
            match stage.run(&descriptor, run, &path, &name).await {
                FetchOutcome::Completed(total) => descriptor.mark_fetched(total),
                FetchOutcome::Superseded => return self.interrupted(&descriptor, &name, None).await,
                FetchOutcome::Cancelled => {
                    return self.discard_cancelled(&descriptor, &name, None).await;
                }
                FetchOutcome::Failed(err) => return self.fail(&descriptor, run, &name, err).await,
            }
        }

        let reference = match &self.store {
            None => None,
            Some(store) => {
                if !descriptor.transition(run, TransferState::Uploading) {
                    return self.interrupted(&descriptor, &name, None).await;
                }
                let stage = RelayStage::new(store.as_ref(), &self.emitter, &self.settings);
                match stage.run(&descriptor, run, &path, &name).await {
                    RelayOutcome::Completed(reference) => Some(reference),
                    RelayOutcome::Superseded => {
                        return self.interrupted(&descriptor, &name, None).await;
                    }
                    RelayOutcome::Failed(err) => {
                        return self.fail(&descriptor, run, &name, err).await;
                    }
                }
            }
        };

        self.conclude(&descriptor, run, &name, &path, reference)
            .await
    }

    /// Assign the artifact name once.
    ///
    /// Derived names probe the source for metadata first. The claimed name is
    /// unique among registered transfers, staged files, and history entries.
    async fn resolve_name(&self, descriptor: &TransferDescriptor) -> String {
        if let Some(name) = descriptor.resolved_name() {
            return name.to_string();
        }
        let candidate = match descriptor.filename_policy().override_name() {
            Some(name) => name.to_string(),
            None => {
                let disposition = match self.source.probe(descriptor.source()).await {
                    Ok(probe) => probe.content_disposition,
                    Err(err) => {
                        debug!(download_id = %descriptor.id(), error = %err, "metadata probe failed");
                        None
                    }
                };
                let ctx = NamingContext::new(descriptor.source())
                    .with_content_disposition(disposition.as_deref());
                derive_filename(&ctx)
            }
        };
        let root = self.artifacts.root();
        let name = self.registry.claim_name(descriptor, &candidate, |name| {
            self.history.contains(name) || root.join(name).exists()
        });
        if name != sanitize_filename(&candidate) {
            debug!(download_id = %descriptor.id(), filename = %name, "artifact name was taken; using alternative");
        }
        name
    }

    async fn prepare(&self, name: &str) -> TransferResult<PathBuf> {
        self.artifacts.ensure_root().await?;
        self.artifacts.path_for(name)
    }

    /// Whether an earlier run already staged the complete body.
    async fn already_staged(&self, descriptor: &TransferDescriptor, path: &Path) -> bool {
        match (descriptor.fetched_total(), file_size(path).await) {
            (Some(total), Ok(Some(size))) => total == size,
            _ => false,
        }
    }

    async fn conclude(
        &self,
        descriptor: &TransferDescriptor,
        run: RunGeneration,
        name: &str,
        path: &Path,
        reference: Option<RemoteReference>,
    ) -> RunOutcome {
        if !descriptor.transition(run, TransferState::Completed) {
            return self.interrupted(descriptor, name, reference).await;
        }
        let size = match descriptor.fetched_total() {
            Some(total) => total,
            None => file_size(path).await.ok().flatten().unwrap_or(0),
        };
        let entry = HistoryEntry {
            name: name.to_string(),
            size,
            completed_at: Utc::now(),
            remote_reference: reference,
        };
        self.history.append(entry.clone());
        self.emitter
            .publish(Event::DownloadComplete(CompletePayload {
                download_id: descriptor.id(),
                filename: name.to_string(),
            }));
        let _ = self.registry.remove(descriptor.id());
        let metrics = self.emitter.metrics();
        metrics.inc_transfer(TransferOutcome::Completed);
        metrics.set_active_transfers(self.registry.len());
        info!(download_id = %descriptor.id(), filename = %name, size, "transfer completed");

        let durable = self.store.as_ref().is_some_and(|store| store.is_durable());
        if durable && entry.remote_reference.is_some() {
            if let Err(err) = self.artifacts.remove(name).await {
                warn!(filename = %name, error = %err, "failed to remove staged artifact");
            }
        }
        RunOutcome::Completed(entry)
    }

    /// Route an interruption: cancellation cleans up, a newer generation exits quietly.
    async fn interrupted(
        &self,
        descriptor: &TransferDescriptor,
        name: &str,
        uploaded: Option<RemoteReference>,
    ) -> RunOutcome {
        if descriptor.is_cancelled() {
            return self.discard_cancelled(descriptor, name, uploaded).await;
        }
        self.discard_remote(uploaded).await;
        debug!(download_id = %descriptor.id(), "run superseded");
        RunOutcome::Superseded
    }

    async fn discard_cancelled(
        &self,
        descriptor: &TransferDescriptor,
        name: &str,
        uploaded: Option<RemoteReference>,
    ) -> RunOutcome {
        self.discard_remote(uploaded).await;
        if let Err(err) = self.artifacts.remove(name).await {
            warn!(filename = %name, error = %err, "failed to remove cancelled artifact");
        }
        let _ = self.registry.remove(descriptor.id());
        self.emitter
            .metrics()
            .set_active_transfers(self.registry.len());
        info!(download_id = %descriptor.id(), "cancelled transfer cleaned up");
        RunOutcome::Cancelled
    }

    async fn discard_remote(&self, uploaded: Option<RemoteReference>) {
        let (Some(store), Some(reference)) = (&self.store, uploaded) else {
            return;
        };
        if let Err(err) = store.delete(&reference.id).await {
            warn!(object_id = %reference.id, error = %err, "failed to delete remote object");
        }
    }

    async fn fail(
        &self,
        descriptor: &TransferDescriptor,
        run: RunGeneration,
        name: &str,
        err: TransferError,
    ) -> RunOutcome {
        if !descriptor.transition(run, TransferState::Errored) {
            debug!(download_id = %descriptor.id(), error = %err, "failure after interruption ignored");
            return self.interrupted(descriptor, name, None).await;
        }
        warn!(
            download_id = %descriptor.id(),
            error = %err,
            retryable = err.is_retryable(),
            "transfer run failed"
        );
        self.emitter.publish(Event::DownloadError(ErrorPayload {
            download_id: descriptor.id(),
            error: err.user_message(),
        }));
        self.emitter.metrics().inc_transfer(TransferOutcome::Failed);
        RunOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::tests::MemoryStore;
    use async_trait::async_trait;
    use bolt_events::{Event, EventBus, EventStream};
    use bolt_telemetry::Metrics;
    use bolt_transfer_core::{
        ByteRange, ByteStream, FilenamePolicy, ProbeResponse, RemoteMetadata, ResumeDecision,
        SourceResponse, TransferRequest, UploadSession,
    };
    use bytes::Bytes;
    use std::sync::OnceLock;
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio::time::timeout;

    /// Serves a fixed body in fixed-size chunks, one chunk per gate permit.
    struct ScriptedSource {
        body: Arc<Vec<u8>>,
        chunk: usize,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl ContentSource for ScriptedSource {
        async fn probe(&self, url: &str) -> TransferResult<ProbeResponse> {
            Err(TransferError::Probe {
                url: url.to_string(),
                source: "no metadata".into(),
            })
        }

        async fn fetch(&self, _url: &str, offset: u64) -> TransferResult<SourceResponse> {
            let start = usize::try_from(offset).expect("offset");
            let tail = self.body[start..].to_vec();
            let len = self.body.len();
            let (gate, chunk) = (Arc::clone(&self.gate), self.chunk);
            let tail_len = tail.len() as u64;
            let body = async_stream::stream! {
                for piece in tail.chunks(chunk) {
                    gate.acquire().await.expect("gate").forget();
                    yield Ok::<Bytes, TransferError>(Bytes::copy_from_slice(piece));
                }
            };
            Ok(SourceResponse {
                status: if offset > 0 { 206 } else { 200 },
                content_length: Some(tail_len),
                content_range: (offset > 0).then(|| format!("bytes {offset}-{}/{len}", len - 1)),
                body: Box::pin(body),
            })
        }
    }

    /// Cancels the target descriptor as soon as an upload begins.
    struct CancelOnCreate {
        inner: MemoryStore,
        target: Arc<OnceLock<Arc<TransferDescriptor>>>,
    }

    #[async_trait]
    impl ObjectStore for CancelOnCreate {
        fn is_durable(&self) -> bool {
            true
        }

        async fn create(&self, name: &str, total_bytes: u64) -> TransferResult<Box<dyn UploadSession>> {
            if let Some(descriptor) = self.target.get() {
                let _ = descriptor.cancel();
            }
            self.inner.create(name, total_bytes).await
        }

        async fn delete(&self, id: &str) -> TransferResult<bool> {
            self.inner.delete(id).await
        }

        async fn metadata(&self, id: &str) -> TransferResult<RemoteMetadata> {
            self.inner.metadata(id).await
        }

        async fn read(&self, id: &str, range: Option<ByteRange>) -> TransferResult<ByteStream> {
            self.inner.read(id, range).await
        }
    }

    /// Cancels the target descriptor while the request is in flight, then fails it.
    struct CancelOnFetch {
        target: Arc<OnceLock<Arc<TransferDescriptor>>>,
    }

    #[async_trait]
    impl ContentSource for CancelOnFetch {
        async fn probe(&self, url: &str) -> TransferResult<ProbeResponse> {
            Err(TransferError::Probe {
                url: url.to_string(),
                source: "no metadata".into(),
            })
        }

        async fn fetch(&self, url: &str, _offset: u64) -> TransferResult<SourceResponse> {
            if let Some(descriptor) = self.target.get() {
                let _ = descriptor.cancel();
            }
            Err(TransferError::HttpStatus {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    fn body() -> Arc<Vec<u8>> {
        Arc::new((0..1_000_u32).map(|n| (n * 7 % 256) as u8).collect())
    }

    fn settings(dir: &Path) -> EngineSettings {
        EngineSettings {
            download_dir: dir.to_path_buf(),
            fetch_chunk_bytes: 1,
            relay_chunk_bytes: 128,
            progress_interval: Duration::ZERO,
        }
    }

    fn named(name: &str) -> TransferDescriptor {
        TransferDescriptor::new(TransferRequest {
            source: "https://x/y.bin".into(),
            filename_policy: FilenamePolicy::Override(name.to_string()),
        })
    }

    fn derived(source: &str) -> TransferDescriptor {
        TransferDescriptor::new(TransferRequest {
            source: source.to_string(),
            filename_policy: FilenamePolicy::DeriveFromSource,
        })
    }

    fn no_terminal_events(bus: &EventBus) -> bool {
        bus.backlog_since(0).iter().all(|env| {
            !matches!(env.event.kind(), "download_error" | "download_complete")
        })
    }

    async fn wait_for_downloaded(stream: &mut EventStream, downloaded: u64) {
        timeout(Duration::from_secs(5), async {
            loop {
                let envelope = stream.next().await.expect("bus closed");
                if let Event::DownloadProgress(payload) = envelope.event
                    && payload.downloaded == downloaded
                {
                    break;
                }
            }
        })
        .await
        .expect("run made no progress");
    }

    struct Rig {
        controller: Arc<TransferController>,
        registry: Registry,
        history: HistoryLog,
        bus: EventBus,
        gate: Arc<Semaphore>,
        dir: tempfile::TempDir,
    }

    fn rig(settings_for: impl FnOnce(&Path) -> EngineSettings) -> Rig {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = Arc::new(Semaphore::new(0));
        let bus = EventBus::new();
        let registry = Registry::new();
        let history = HistoryLog::new();
        let controller = Arc::new(TransferController::new(
            Arc::new(ScriptedSource {
                body: body(),
                chunk: 100,
                gate: Arc::clone(&gate),
            }),
            None,
            registry.clone(),
            history.clone(),
            Emitter::new(bus.clone(), Metrics::new().expect("metrics")),
            settings_for(dir.path()),
        ));
        Rig {
            controller,
            registry,
            history,
            bus,
            gate,
            dir,
        }
    }

    #[tokio::test]
    async fn cancel_mid_fetch_finishes_chunk_then_deletes_artifact() {
        let rig = rig(settings);
        let descriptor = rig.registry.insert(named("midway.bin"));
        let mut stream = rig.bus.subscribe(None);

        rig.controller
            .spawn(Arc::clone(&descriptor), descriptor.current_generation());
        rig.gate.add_permits(3);
        wait_for_downloaded(&mut stream, 300).await;
        assert!(rig.dir.path().join("midway.bin").exists());

        assert_eq!(descriptor.cancel(), Some(TransferState::Fetching));
        rig.gate.add_permits(100);
        let outcome = timeout(Duration::from_secs(5), rig.controller.join(descriptor.id()))
            .await
            .expect("run stalled");

        assert!(matches!(outcome, Some(RunOutcome::Cancelled)));
        assert!(!rig.dir.path().join("midway.bin").exists());
        assert!(rig.registry.is_empty());
        assert!(rig.history.is_empty());
        assert!(no_terminal_events(&rig.bus));
    }

    #[tokio::test]
    async fn paused_run_keeps_every_byte_it_reported() {
        let rig = rig(|dir| EngineSettings {
            fetch_chunk_bytes: 64 * 1024,
            ..settings(dir)
        });
        let descriptor = rig.registry.insert(named("held.bin"));
        let mut stream = rig.bus.subscribe(None);

        rig.controller
            .spawn(Arc::clone(&descriptor), descriptor.current_generation());
        rig.gate.add_permits(3);
        wait_for_downloaded(&mut stream, 300).await;
        assert!(descriptor.pause());
        rig.gate.add_permits(1);
        let outcome = timeout(Duration::from_secs(5), rig.controller.join(descriptor.id()))
            .await
            .expect("run stalled");

        assert!(matches!(outcome, Some(RunOutcome::Superseded)));
        let reported = descriptor.last_status().expect("status").downloaded;
        let staged = tokio::fs::metadata(rig.dir.path().join("held.bin"))
            .await
            .expect("staged file")
            .len();
        assert_eq!(reported, 300);
        assert_eq!(staged, reported);
    }

    #[tokio::test]
    async fn transfers_of_one_source_never_share_a_staging_file() {
        let rig = rig(settings);
        rig.gate.add_permits(1_000);
        let first = rig.registry.insert(derived("https://x/y.bin"));
        let outcome = rig
            .controller
            .run(Arc::clone(&first), first.current_generation())
            .await;
        assert!(matches!(outcome, RunOutcome::Completed(ref entry) if entry.name == "y.bin"));
        let recorded = rig.dir.path().join("y.bin");
        assert!(recorded.exists());

        let second = rig.registry.insert(derived("https://x/y.bin"));
        let third = rig.registry.insert(derived("https://x/y.bin"));
        assert_eq!(rig.controller.resolve_name(&second).await, "y (1).bin");
        assert_eq!(rig.controller.resolve_name(&third).await, "y (2).bin");

        assert!(second.cancel().is_some());
        let outcome = rig
            .controller
            .run(Arc::clone(&second), second.current_generation())
            .await;
        assert!(matches!(outcome, RunOutcome::Cancelled));
        assert!(recorded.exists());
        assert_eq!(rig.history.len(), 1);
    }

    #[tokio::test]
    async fn cancel_racing_a_failure_still_cleans_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = Arc::new(OnceLock::new());
        let bus = EventBus::new();
        let registry = Registry::new();
        let controller = TransferController::new(
            Arc::new(CancelOnFetch {
                target: Arc::clone(&target),
            }),
            None,
            registry.clone(),
            HistoryLog::new(),
            Emitter::new(bus.clone(), Metrics::new().expect("metrics")),
            settings(dir.path()),
        );
        let descriptor = registry.insert(derived("https://x/late.bin"));
        assert_eq!(descriptor.resolve_name_with(|| "late.bin".into()), "late.bin");
        let partial = dir.path().join("late.bin");
        tokio::fs::write(&partial, b"partial").await.expect("seed");
        let _ = target.set(Arc::clone(&descriptor));

        let outcome = controller
            .run(Arc::clone(&descriptor), descriptor.current_generation())
            .await;

        assert!(matches!(outcome, RunOutcome::Cancelled));
        assert_eq!(descriptor.state(), TransferState::Cancelled);
        assert!(!partial.exists());
        assert!(registry.is_empty());
        assert!(no_terminal_events(&bus));
    }

    #[tokio::test]
    async fn relaunched_run_waits_for_stale_writer_and_output_is_identical() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = Arc::new(Semaphore::new(0));
        let body = body();
        let source = ScriptedSource {
            body: Arc::clone(&body),
            chunk: 100,
            gate: Arc::clone(&gate),
        };
        let bus = EventBus::new();
        let registry = Registry::new();
        let controller = Arc::new(TransferController::new(
            Arc::new(source),
            None,
            registry.clone(),
            HistoryLog::new(),
            Emitter::new(bus.clone(), Metrics::new().expect("metrics")),
            settings(dir.path()),
        ));
        let descriptor = registry.insert(named("scripted.bin"));
        let id = descriptor.id();
        let mut stream = bus.subscribe(None);

        controller.spawn(Arc::clone(&descriptor), descriptor.current_generation());
        gate.add_permits(3);
        timeout(Duration::from_secs(5), async {
            loop {
                let envelope = stream.next().await.expect("bus closed");
                if let Event::DownloadProgress(payload) = envelope.event
                    && payload.downloaded == 300
                {
                    break;
                }
            }
        })
        .await
        .expect("first run made no progress");

        assert!(descriptor.pause());
        let ResumeDecision::Relaunch(run) = descriptor.resume() else {
            panic!("paused descriptor must relaunch");
        };
        controller.spawn(Arc::clone(&descriptor), run);
        gate.add_permits(100);

        let outcome = timeout(Duration::from_secs(5), controller.join(id))
            .await
            .expect("run stalled");
        assert!(matches!(outcome, Some(RunOutcome::Completed(ref entry)) if entry.size == 1_000));
        let staged = tokio::fs::read(dir.path().join("scripted.bin"))
            .await
            .expect("read");
        assert_eq!(staged, *body);
    }

    #[tokio::test]
    async fn cancel_during_relay_deletes_uploaded_object_and_skips_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = Arc::new(Semaphore::new(1_000));
        let memory = MemoryStore::default();
        let target = Arc::new(OnceLock::new());
        let store = CancelOnCreate {
            inner: memory.clone(),
            target: Arc::clone(&target),
        };
        let bus = EventBus::new();
        let registry = Registry::new();
        let history = HistoryLog::new();
        let controller = TransferController::new(
            Arc::new(ScriptedSource {
                body: body(),
                chunk: 250,
                gate,
            }),
            Some(Arc::new(store)),
            registry.clone(),
            history.clone(),
            Emitter::new(bus.clone(), Metrics::new().expect("metrics")),
            settings(dir.path()),
        );
        let descriptor = registry.insert(named("relay.bin"));
        let _ = target.set(Arc::clone(&descriptor));

        let run = descriptor.current_generation();
        let outcome = controller.run(Arc::clone(&descriptor), run).await;

        assert!(matches!(outcome, RunOutcome::Cancelled));
        assert_eq!(memory.deleted.lock().expect("lock").len(), 1);
        assert!(memory.objects.lock().expect("lock").is_empty());
        assert!(history.is_empty());
        assert!(registry.is_empty());
        assert!(!dir.path().join("relay.bin").exists());
        assert!(
            bus.backlog_since(0)
                .iter()
                .all(|env| env.event.kind() != "download_complete")
        );
    }

    #[tokio::test]
    async fn staged_artifact_is_reused_after_a_relay_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let gate = Arc::new(Semaphore::new(1_000));
        let failing = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let registry = Registry::new();
        let controller = TransferController::new(
            Arc::new(ScriptedSource {
                body: body(),
                chunk: 500,
                gate: Arc::clone(&gate),
            }),
            Some(Arc::new(failing)),
            registry.clone(),
            HistoryLog::new(),
            Emitter::new(EventBus::new(), Metrics::new().expect("metrics")),
            settings(dir.path()),
        );
        let descriptor = registry.insert(named("again.bin"));

        let outcome = controller
            .run(Arc::clone(&descriptor), descriptor.current_generation())
            .await;
        assert!(matches!(outcome, RunOutcome::Failed));
        assert_eq!(descriptor.state(), TransferState::Errored);
        assert_eq!(descriptor.fetched_total(), Some(1_000));

        let ResumeDecision::Relaunch(run) = descriptor.resume() else {
            panic!("errored descriptor must relaunch");
        };
        gate.forget_permits(1_000);
        let outcome = timeout(
            Duration::from_secs(1),
            controller.run(Arc::clone(&descriptor), run),
        )
        .await
        .expect("fetch should have been skipped");
        assert!(matches!(outcome, RunOutcome::Failed));
        assert_eq!(registry.len(), 1);
    }
}
