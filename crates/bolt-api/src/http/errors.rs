//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use bolt_transfer_core::TransferError;

use crate::http::constants::{
    PROBLEM_BAD_GATEWAY, PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND,
    PROBLEM_RANGE_NOT_SATISFIABLE, PROBLEM_SERVICE_UNAVAILABLE,
};
use crate::models::ProblemDetails;

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    pub(crate) fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_SERVICE_UNAVAILABLE,
            "service unavailable",
        )
        .with_detail(detail)
    }

    pub(crate) const fn range_not_satisfiable() -> Self {
        Self::new(
            StatusCode::RANGE_NOT_SATISFIABLE,
            PROBLEM_RANGE_NOT_SATISFIABLE,
            "range not satisfiable",
        )
    }

    pub(crate) fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, PROBLEM_BAD_GATEWAY, "upstream failure")
            .with_detail(detail)
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match &err {
            TransferError::UnknownTransfer { id } => {
                Self::not_found(format!("transfer {id} not found"))
            }
            TransferError::RemoteNotFound { id } => {
                Self::not_found(format!("object {id} not found"))
            }
            TransferError::InvalidInput { .. } => Self::bad_request(err.user_message()),
            TransferError::RemoteStoreUnavailable => {
                Self::service_unavailable("remote store is not configured")
            }
            TransferError::RemoteStore { .. }
            | TransferError::Network { .. }
            | TransferError::HttpStatus { .. }
            | TransferError::Probe { .. } => {
                warn!(error = %err, detail = %err.user_message(), "upstream request failed");
                Self::bad_gateway(err.user_message())
            }
            TransferError::Filesystem { operation, path, .. } => {
                error!(
                    error = %err,
                    operation,
                    path = %path.display(),
                    "filesystem failure while serving request"
                );
                Self::internal("filesystem operation failed")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}
