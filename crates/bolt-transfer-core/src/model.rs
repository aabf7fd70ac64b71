//! Shared transfer model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bolt_events::ProgressPayload;

/// How the local and remote artifact name is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "name", rename_all = "snake_case")]
pub enum FilenamePolicy {
    /// Derive from remote metadata or the source location.
    DeriveFromSource,
    /// Use the caller supplied name (sanitized before use).
    Override(String),
}

impl FilenamePolicy {
    /// Build a policy from the wire-level `filename_mode` / `custom_filename` pair.
    ///
    /// A `custom` mode with a blank name falls back to derivation.
    #[must_use]
    pub fn from_request(mode: Option<&str>, custom: Option<&str>) -> Self {
        match (mode, custom.map(str::trim)) {
            (Some("custom"), Some(name)) if !name.is_empty() => Self::Override(name.to_string()),
            _ => Self::DeriveFromSource,
        }
    }

    /// Name supplied by the caller, if any.
    #[must_use]
    pub fn override_name(&self) -> Option<&str> {
        match self {
            Self::Override(name) => Some(name.as_str()),
            Self::DeriveFromSource => None,
        }
    }
}

/// Request accepted by the workflow to begin a new transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Remote source location.
    pub source: String,
    /// Naming policy for the artifact.
    pub filename_policy: FilenamePolicy,
}

/// Lifecycle state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Registered but no run has started yet.
    Created,
    /// Fetch stage is streaming from the source.
    Fetching,
    /// Relay stage is streaming to the object store.
    Uploading,
    /// Interrupted by the user; resumable.
    Paused,
    /// Relay finished and history recorded.
    Completed,
    /// Terminal cancellation.
    Cancelled,
    /// Last run failed; resumable.
    Errored,
}

impl TransferState {
    /// Whether the state ends the transfer lifecycle.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Reference to an object held by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReference {
    /// Opaque object id.
    pub id: String,
    /// Optional link that can be shared with users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_link: Option<String>,
}

/// Metadata reported by the remote store for an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    /// Object name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Mime type used when streaming the object.
    pub mime_type: String,
}

/// Progress update reported by the remote store while uploading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Cumulative bytes accepted by the store.
    pub bytes_sent: u64,
    /// Total bytes expected for the object.
    pub total_bytes: u64,
}

/// Completed transfer recorded in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Artifact name.
    pub name: String,
    /// Artifact size in bytes.
    pub size: u64,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
    /// Remote copy, absent when no store was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_reference: Option<RemoteReference>,
}

/// Point-in-time view of a registered transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferSnapshot {
    /// Transfer identifier.
    pub id: Uuid,
    /// Remote source location.
    pub source: String,
    /// Resolved artifact name once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Current lifecycle state.
    pub state: TransferState,
    /// Paused flag.
    pub paused: bool,
    /// Cancelled flag.
    pub cancelled: bool,
    /// Most recent progress snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<ProgressPayload>,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}
