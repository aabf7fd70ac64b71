//! Request and response bodies exchanged over the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bolt_transfer_core::{DetectionSource, FilenamePolicy, TransferRequest};

/// RFC9457 problem document returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// Problem type URI.
    #[serde(rename = "type")]
    pub kind: String,
    /// Short summary of the problem class.
    pub title: String,
    /// HTTP status code.
    pub status: u16,
    /// Occurrence-specific explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Body of `POST /v1/downloads`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartTransferRequest {
    /// Source location.
    pub url: String,
    /// `original` (default) or `custom`.
    #[serde(default)]
    pub filename_mode: Option<String>,
    /// Name used when `filename_mode` is `custom`.
    #[serde(default)]
    pub custom_filename: Option<String>,
}

impl From<StartTransferRequest> for TransferRequest {
    fn from(request: StartTransferRequest) -> Self {
        let filename_policy = FilenamePolicy::from_request(
            request.filename_mode.as_deref(),
            request.custom_filename.as_deref(),
        );
        Self {
            source: request.url,
            filename_policy,
        }
    }
}

/// Response of `POST /v1/downloads`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartTransferResponse {
    /// Identifier used by the control routes and events.
    pub download_id: Uuid,
}

/// Body carrying a single URL.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlRequest {
    /// Source or share link.
    pub url: String,
}

/// Response of `POST /v1/filename/detect`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DetectFilenameResponse {
    /// Always `true`; detection never fails outright.
    pub success: bool,
    /// Suggested name.
    pub filename: String,
    /// Whether the name was probed or derived offline.
    pub source: DetectionSource,
}

/// Response of `POST /v1/links/convert`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertLinkResponse {
    /// Whether the link was rewritten.
    pub success: bool,
    /// Direct download link when rewritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_url: Option<String>,
}

/// Response of `DELETE /v1/history/{name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryDeleteResponse {
    /// Whether anything was removed.
    pub success: bool,
    /// Human-readable outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: String,
    /// Build identifier.
    pub build: String,
    /// Transfers currently registered.
    pub active_transfers: i64,
}
