//! Workflow and inspector façade over the controller and shared tables.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use bolt_events::{Event, EventBus, PausedPayload};
use bolt_telemetry::{Metrics, TransferOutcome};
use bolt_transfer_core::naming::{NamingContext, derive_filename, sanitize_filename};
use bolt_transfer_core::{
    ContentSource, DetectionSource, FilenameDetection, HistoryEntry, HistoryLog, HistoryRemoval,
    ObjectStore, Registry, ResumeDecision, TransferDescriptor, TransferError, TransferInspector,
    TransferRequest, TransferResult, TransferSnapshot, TransferState, TransferWorkflow,
    starting_snapshot,
};

use crate::artifact::{LocalArtifacts, validate_artifact_name};
use crate::controller::{RunOutcome, TransferController};
use crate::emit::Emitter;
use crate::settings::EngineSettings;

/// Transfer engine entry point used by the API layer.
#[derive(Clone)]
pub struct TransferService {
    controller: Arc<TransferController>,
    source: Arc<dyn ContentSource>,
    store: Option<Arc<dyn ObjectStore>>,
    registry: Registry,
    history: HistoryLog,
    emitter: Emitter,
}

impl TransferService {
    /// Wire the engine with fresh registry and history tables.
    #[must_use]
    pub fn new(
        source: Arc<dyn ContentSource>,
        store: Option<Arc<dyn ObjectStore>>,
        events: EventBus,
        metrics: Metrics,
        settings: EngineSettings,
    ) -> Self {
        let registry = Registry::new();
        let history = HistoryLog::new();
        let emitter = Emitter::new(events, metrics);
        let controller = Arc::new(TransferController::new(
            Arc::clone(&source),
            store.clone(),
            registry.clone(),
            history.clone(),
            emitter.clone(),
            settings,
        ));
        Self {
            controller,
            source,
            store,
            registry,
            history,
            emitter,
        }
    }

    /// Staging directory access.
    #[must_use]
    pub fn artifacts(&self) -> LocalArtifacts {
        self.controller.artifacts().clone()
    }

    /// Configured object store, if any.
    #[must_use]
    pub fn object_store(&self) -> Option<Arc<dyn ObjectStore>> {
        self.store.clone()
    }

    /// Wait for the most recent run of `id` to finish.
    pub async fn join(&self, id: Uuid) -> Option<RunOutcome> {
        self.controller.join(id).await
    }

    fn lookup(&self, id: Uuid) -> TransferResult<Arc<TransferDescriptor>> {
        self.registry
            .get(id)
            .ok_or(TransferError::UnknownTransfer { id })
    }

    fn refresh_active(&self) {
        self.emitter
            .metrics()
            .set_active_transfers(self.registry.len());
    }
}

/// Only absolute http(s) sources can be fetched.
fn validate_source(source: &str) -> TransferResult<()> {
    let invalid = |reason| TransferError::InvalidInput {
        field: "url",
        reason,
        value: Some(source.to_string()),
    };
    let url = Url::parse(source.trim()).map_err(|_| invalid("must be an absolute URL"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(invalid("scheme must be http or https")),
    }
}

#[async_trait]
impl TransferWorkflow for TransferService {
    async fn start(&self, request: TransferRequest) -> TransferResult<Uuid> {
        validate_source(&request.source)?;
        let request = TransferRequest {
            source: request.source.trim().to_string(),
            ..request
        };
        let descriptor = self.registry.insert(TransferDescriptor::new(request));
        let id = descriptor.id();
        self.emitter.progress(&descriptor, starting_snapshot(id));
        self.emitter.metrics().inc_transfer(TransferOutcome::Started);
        self.refresh_active();
        info!(download_id = %id, source = %descriptor.source(), "transfer accepted");

        let run = descriptor.current_generation();
        self.controller.spawn(descriptor, run);
        Ok(id)
    }

    async fn pause(&self, id: Uuid) -> TransferResult<()> {
        let descriptor = self.lookup(id)?;
        if descriptor.pause() {
            self.emitter
                .publish(Event::DownloadPaused(PausedPayload { download_id: id }));
            self.emitter.metrics().inc_transfer(TransferOutcome::Paused);
            info!(download_id = %id, "transfer paused");
        } else {
            debug!(download_id = %id, "pause ignored");
        }
        Ok(())
    }

    async fn resume(&self, id: Uuid) -> TransferResult<()> {
        let descriptor = self.lookup(id)?;
        match descriptor.resume() {
            ResumeDecision::Relaunch(run) => {
                self.emitter.metrics().inc_transfer(TransferOutcome::Resumed);
                info!(download_id = %id, "transfer resumed");
                self.controller.spawn(descriptor, run);
                Ok(())
            }
            ResumeDecision::AlreadyRunning => {
                debug!(download_id = %id, "resume ignored for running transfer");
                Ok(())
            }
            ResumeDecision::Cancelled => Err(TransferError::UnknownTransfer { id }),
        }
    }

    async fn cancel(&self, id: Uuid) -> TransferResult<()> {
        let descriptor = self
            .registry
            .remove(id)
            .ok_or(TransferError::UnknownTransfer { id })?;
        let Some(prior) = descriptor.cancel() else {
            return Ok(());
        };
        self.emitter.metrics().inc_transfer(TransferOutcome::Cancelled);
        self.refresh_active();
        info!(download_id = %id, state = ?prior, "transfer cancelled");

        // Runs only exist outside these states; they clean up after themselves.
        if matches!(prior, TransferState::Paused | TransferState::Errored)
            && let Some(name) = descriptor.resolved_name()
        {
            match self.controller.artifacts().remove(name).await {
                Ok(removed) => debug!(download_id = %id, removed, "partial artifact discarded"),
                Err(err) => warn!(download_id = %id, error = %err, "failed to discard artifact"),
            }
        }
        Ok(())
    }

    async fn remove_history(&self, name: &str) -> TransferResult<HistoryRemoval> {
        validate_artifact_name(name)?;
        let entries_removed = self.history.remove_by_name(name);
        let artifact_deleted = self.controller.artifacts().remove(name).await?;
        info!(filename = %name, entries_removed, artifact_deleted, "history entry removed");
        Ok(HistoryRemoval {
            entries_removed,
            artifact_deleted,
        })
    }
}

#[async_trait]
impl TransferInspector for TransferService {
    async fn list(&self) -> Vec<TransferSnapshot> {
        self.registry.snapshots()
    }

    async fn get(&self, id: Uuid) -> Option<TransferSnapshot> {
        self.registry.get(id).map(|descriptor| descriptor.snapshot())
    }

    async fn replay_events(&self) -> Vec<Event> {
        self.registry.replay_events()
    }

    async fn history(&self) -> Vec<HistoryEntry> {
        self.history.newest_first()
    }

    async fn detect_filename(&self, source: &str) -> FilenameDetection {
        let ctx = NamingContext::new(source);
        match self.source.probe(source).await {
            Ok(probe) => {
                let ctx = ctx.with_content_disposition(probe.content_disposition.as_deref());
                FilenameDetection {
                    filename: sanitize_filename(&derive_filename(&ctx)),
                    source: DetectionSource::Detected,
                }
            }
            Err(err) => {
                debug!(source = %source, error = %err, "filename probe failed");
                FilenameDetection {
                    filename: sanitize_filename(&derive_filename(&ctx)),
                    source: DetectionSource::Fallback,
                }
            }
        }
    }
}
