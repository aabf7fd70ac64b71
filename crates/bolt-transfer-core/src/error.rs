//! # Design
//!
//! - One error type for both transfer stages, classified the way the controller
//!   needs to react to it (retry via resume, absorb, or surface).
//! - Messages are constant; context lives in structured fields.
//! - Interruption by a newer generation is not an error and never appears here.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Result alias for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Failures raised by the fetch and relay stages and their collaborators.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Metadata probe or filename detection failed. Always absorbed by a fallback.
    #[error("metadata probe failed")]
    Probe {
        /// Source that was probed.
        url: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Connect, read, or timeout failure while talking to the content source.
    #[error("network transfer failed")]
    Network {
        /// Operation identifier.
        operation: &'static str,
        /// Source location.
        url: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The content source answered with a non-success status.
    #[error("unexpected response status")]
    HttpStatus {
        /// Source location.
        url: String,
        /// Status code returned.
        status: u16,
    },
    /// The remote object store rejected or failed an operation.
    #[error("remote store operation failed")]
    RemoteStore {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// No usable remote store client is available.
    #[error("remote store unavailable")]
    RemoteStoreUnavailable,
    /// The remote store has no object with the given id.
    #[error("remote object not found")]
    RemoteNotFound {
        /// Opaque object id.
        id: String,
    },
    /// Local filesystem failure (disk full, permissions, missing directory).
    #[error("filesystem operation failed")]
    Filesystem {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// No registered transfer has the given id.
    #[error("transfer not found")]
    UnknownTransfer {
        /// Requested identifier.
        id: Uuid,
    },
    /// Caller supplied an invalid value.
    #[error("invalid transfer input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl TransferError {
    /// Wrap an IO error with filesystem context.
    #[must_use]
    pub fn filesystem(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Wrap a transport failure with network context.
    #[must_use]
    pub fn network(
        operation: &'static str,
        url: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            operation,
            url: url.into(),
            source: source.into(),
        }
    }

    /// Wrap a remote store failure.
    #[must_use]
    pub fn remote_store(
        operation: &'static str,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self::RemoteStore {
            operation,
            source: source.into(),
        }
    }

    /// Whether a subsequent resume request may succeed without operator action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::HttpStatus { .. }
                | Self::RemoteStore { .. }
                | Self::RemoteStoreUnavailable
        )
    }

    /// Message delivered to subscribers in `download_error` events.
    ///
    /// Includes the innermost source so the reason is visible to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        let detail = match self {
            Self::HttpStatus { status, .. } => Some(format!("status {status}")),
            Self::RemoteNotFound { id } => Some(id.clone()),
            Self::UnknownTransfer { id } => Some(id.to_string()),
            Self::InvalidInput { field, reason, .. } => Some(format!("{field}: {reason}")),
            _ => {
                let mut current: Option<&(dyn Error + 'static)> = self.source();
                let mut last = None;
                while let Some(err) = current {
                    last = Some(err.to_string());
                    current = err.source();
                }
                last
            }
        };
        detail.map_or_else(|| self.to_string(), |detail| format!("{self}: {detail}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_includes_innermost_source() {
        let err = TransferError::filesystem(
            "fetch.write",
            "/tmp/a.bin",
            io::Error::new(io::ErrorKind::StorageFull, "no space left on device"),
        );
        assert_eq!(
            err.user_message(),
            "filesystem operation failed: no space left on device"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn status_errors_are_retryable_and_describe_status() {
        let err = TransferError::HttpStatus {
            url: "https://x/y.bin".into(),
            status: 503,
        };
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "unexpected response status: status 503");
    }

    #[test]
    fn unavailable_store_message_is_constant() {
        let err = TransferError::RemoteStoreUnavailable;
        assert_eq!(err.user_message(), "remote store unavailable");
    }
}
