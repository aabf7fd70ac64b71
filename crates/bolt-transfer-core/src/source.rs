//! Remote content source collaborator.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;

use crate::error::TransferResult;
use crate::range::content_range_total;

/// Streamed body yielded by sources and stores.
pub type ByteStream = Pin<Box<dyn Stream<Item = TransferResult<Bytes>> + Send>>;

/// HTTP status for a successful range request.
pub const STATUS_PARTIAL_CONTENT: u16 = 206;
/// HTTP status for a range beyond the end of the resource.
pub const STATUS_RANGE_NOT_SATISFIABLE: u16 = 416;

/// Header-only metadata returned by a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResponse {
    /// Raw `Content-Disposition` header.
    pub content_disposition: Option<String>,
    /// Advertised body length.
    pub content_length: Option<u64>,
}

/// Response to a (possibly ranged) body request.
pub struct SourceResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Length` header.
    pub content_length: Option<u64>,
    /// `Content-Range` header.
    pub content_range: Option<String>,
    /// Body stream.
    pub body: ByteStream,
}

impl SourceResponse {
    /// Whether the source honoured the range request.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.status == STATUS_PARTIAL_CONTENT
    }

    /// Whether the status is in the 2xx class.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// Total resource size implied by the response.
    ///
    /// Prefers the `Content-Range` total; otherwise the body length plus `offset`
    /// when the range was honoured, or the body length alone when it was not.
    #[must_use]
    pub fn total_size(&self, offset: u64) -> u64 {
        if let Some(total) = self.content_range.as_deref().and_then(content_range_total) {
            return total;
        }
        let length = self.content_length.unwrap_or(0);
        if self.is_partial() {
            length + offset
        } else {
            length
        }
    }
}

impl std::fmt::Debug for SourceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

/// Remote location that bytes are fetched from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch response headers without the body.
    async fn probe(&self, url: &str) -> TransferResult<ProbeResponse>;

    /// Request the body starting at `offset`; `0` requests the whole resource.
    ///
    /// Non-success statuses are returned, not raised, so the caller can inspect them.
    async fn fetch(&self, url: &str, offset: u64) -> TransferResult<SourceResponse>;
}
