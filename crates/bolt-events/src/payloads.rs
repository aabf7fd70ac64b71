//! Event payload types carried to subscribers.
//!
//! Field names are part of the external contract observed by clients, so the
//! payload structs serialize exactly as declared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the service.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Stage of the transfer pipeline a progress snapshot belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    /// Bytes are streaming from the remote source to local storage.
    Downloading,
    /// The staged artifact is streaming to the remote object store.
    Uploading,
}

impl TransferPhase {
    /// Wire representation of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Uploading => "uploading",
        }
    }
}

/// Progress snapshot for a single transfer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressPayload {
    /// Transfer identifier.
    pub download_id: Uuid,
    /// Resolved (or placeholder) artifact name.
    pub filename: String,
    /// Pipeline stage this snapshot describes.
    pub phase: TransferPhase,
    /// Completion percentage within the phase, `0.0..=100.0`.
    pub percentage: f64,
    /// Human-readable transfer rate.
    pub speed: String,
    /// Human-readable time remaining.
    pub eta: String,
    /// Bytes handled so far in this phase.
    pub downloaded: u64,
    /// Total bytes expected, `0` when unknown.
    pub total_size: u64,
}

/// Acknowledgement that a transfer was paused.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PausedPayload {
    /// Transfer identifier.
    pub download_id: Uuid,
}

/// Notification that a transfer finished both stages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletePayload {
    /// Transfer identifier.
    pub download_id: Uuid,
    /// Final artifact name.
    pub filename: String,
}

/// Notification that a transfer run failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    /// Transfer identifier.
    pub download_id: Uuid,
    /// Failure description suitable for display.
    pub error: String,
}

/// Periodic host telemetry sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerStatsPayload {
    /// Memory utilisation as a percentage.
    pub ram: f64,
    /// Memory in use, in MiB.
    pub ram_used: f64,
    /// Total memory, in MiB.
    pub ram_total: f64,
}

/// Typed events surfaced to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// Throttled progress snapshot for a transfer.
    DownloadProgress(ProgressPayload),
    /// A transfer was paused on request.
    DownloadPaused(PausedPayload),
    /// A transfer completed successfully.
    DownloadComplete(CompletePayload),
    /// A transfer run failed.
    DownloadError(ErrorPayload),
    /// Host telemetry sample.
    ServerStats(ServerStatsPayload),
}

impl Event {
    /// Event name used by transports (e.g. the SSE `event:` field).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DownloadProgress(_) => "download_progress",
            Self::DownloadPaused(_) => "download_paused",
            Self::DownloadComplete(_) => "download_complete",
            Self::DownloadError(_) => "download_error",
            Self::ServerStats(_) => "server_stats",
        }
    }

    /// Transfer the event refers to, if any.
    #[must_use]
    pub const fn download_id(&self) -> Option<Uuid> {
        match self {
            Self::DownloadProgress(payload) => Some(payload.download_id),
            Self::DownloadPaused(payload) => Some(payload.download_id),
            Self::DownloadComplete(payload) => Some(payload.download_id),
            Self::DownloadError(payload) => Some(payload.download_id),
            Self::ServerStats(_) => None,
        }
    }

    /// Serialize only the payload, without the event name wrapper.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be encoded as JSON.
    pub fn data_json(&self) -> serde_json::Result<String> {
        match self {
            Self::DownloadProgress(payload) => serde_json::to_string(payload),
            Self::DownloadPaused(payload) => serde_json::to_string(payload),
            Self::DownloadComplete(payload) => serde_json::to_string(payload),
            Self::DownloadError(payload) => serde_json::to_string(payload),
            Self::ServerStats(payload) => serde_json::to_string(payload),
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Event body.
    pub event: Event,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample_progress() -> ProgressPayload {
        ProgressPayload {
            download_id: Uuid::nil(),
            filename: "y.bin".into(),
            phase: TransferPhase::Downloading,
            percentage: 40.0,
            speed: "1.0 KB/s".into(),
            eta: "00:01".into(),
            downloaded: 400,
            total_size: 1_000,
        }
    }

    #[test]
    fn event_kind_maps_variants() {
        let id = Uuid::nil();
        assert_eq!(
            Event::DownloadProgress(sample_progress()).kind(),
            "download_progress"
        );
        assert_eq!(
            Event::DownloadPaused(PausedPayload { download_id: id }).kind(),
            "download_paused"
        );
        assert_eq!(
            Event::DownloadComplete(CompletePayload {
                download_id: id,
                filename: "a".into()
            })
            .kind(),
            "download_complete"
        );
        assert_eq!(
            Event::DownloadError(ErrorPayload {
                download_id: id,
                error: "boom".into()
            })
            .kind(),
            "download_error"
        );
        let stats = Event::ServerStats(ServerStatsPayload {
            ram: 12.5,
            ram_used: 1.0,
            ram_total: 8.0,
        });
        assert_eq!(stats.kind(), "server_stats");
        assert_eq!(stats.download_id(), None);
    }

    #[test]
    fn progress_payload_has_exact_field_set() -> serde_json::Result<()> {
        let data: Value =
            serde_json::from_str(&Event::DownloadProgress(sample_progress()).data_json()?)?;
        assert_eq!(
            data,
            json!({
                "download_id": "00000000-0000-0000-0000-000000000000",
                "filename": "y.bin",
                "phase": "downloading",
                "percentage": 40.0,
                "speed": "1.0 KB/s",
                "eta": "00:01",
                "downloaded": 400,
                "total_size": 1000
            })
        );
        Ok(())
    }

    #[test]
    fn error_payload_has_exact_field_set() -> serde_json::Result<()> {
        let event = Event::DownloadError(ErrorPayload {
            download_id: Uuid::nil(),
            error: "connection reset".into(),
        });
        let data: Value = serde_json::from_str(&event.data_json()?)?;
        assert_eq!(
            data,
            json!({
                "download_id": "00000000-0000-0000-0000-000000000000",
                "error": "connection reset"
            })
        );
        Ok(())
    }

    #[test]
    fn tagged_form_carries_event_name() -> serde_json::Result<()> {
        let event = Event::DownloadPaused(PausedPayload {
            download_id: Uuid::nil(),
        });
        let value = serde_json::to_value(&event)?;
        assert_eq!(value["event"], "download_paused");
        assert_eq!(
            value["data"]["download_id"],
            "00000000-0000-0000-0000-000000000000"
        );
        Ok(())
    }
}
