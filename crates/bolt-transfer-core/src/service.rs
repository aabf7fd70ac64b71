//! Workflow and inspection façades consumed by the API layer.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use bolt_events::Event;

use crate::error::TransferResult;
use crate::model::{HistoryEntry, TransferRequest, TransferSnapshot};

/// Where a detected filename came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    /// Probe succeeded and headers or the URL supplied the name.
    Detected,
    /// Probe failed; the name came from the offline derivation chain.
    Fallback,
}

/// Filename suggested for a source before a transfer is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilenameDetection {
    /// Suggested name.
    pub filename: String,
    /// Whether the name was probed or derived offline.
    pub source: DetectionSource,
}

/// Result of deleting a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryRemoval {
    /// Entries dropped from the log.
    pub entries_removed: usize,
    /// Whether a local artifact was deleted.
    pub artifact_deleted: bool,
}

/// Lifecycle control for transfers.
#[async_trait]
pub trait TransferWorkflow: Send + Sync {
    /// Register and launch a transfer; returns immediately with its id.
    async fn start(&self, request: TransferRequest) -> TransferResult<Uuid>;

    /// Pause a running transfer.
    async fn pause(&self, id: Uuid) -> TransferResult<()>;

    /// Resume a paused or failed transfer.
    async fn resume(&self, id: Uuid) -> TransferResult<()>;

    /// Cancel a transfer and discard its local artifact.
    async fn cancel(&self, id: Uuid) -> TransferResult<()>;

    /// Drop a history entry and its local artifact.
    async fn remove_history(&self, name: &str) -> TransferResult<HistoryRemoval>;
}

/// Read access to registry and history state.
#[async_trait]
pub trait TransferInspector: Send + Sync {
    /// All registered transfers.
    async fn list(&self) -> Vec<TransferSnapshot>;

    /// A single registered transfer.
    async fn get(&self, id: Uuid) -> Option<TransferSnapshot>;

    /// Events replayed to a newly connected subscriber.
    async fn replay_events(&self) -> Vec<Event>;

    /// Completed transfers, newest first.
    async fn history(&self) -> Vec<HistoryEntry>;

    /// Suggest a filename for `source` without starting a transfer.
    async fn detect_filename(&self, source: &str) -> FilenameDetection;
}
