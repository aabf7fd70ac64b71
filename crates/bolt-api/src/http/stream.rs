//! Byte-range file serving for local artifacts and remote objects.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE},
    },
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use bolt_transfer_core::mime::mime_type_for;
use bolt_transfer_core::{ByteRange, ByteStream, RangeRequest, resolve_range};

use crate::http::constants::ACCEPT_RANGES_BYTES;
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn stream_local(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let size = state
        .artifacts
        .size(&name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("file {name} not found")))?;
    let range = match plan(&headers, size) {
        Ok(range) => range,
        Err(response) => return Ok(response),
    };
    let body = state.artifacts.read(&name, range).await?;
    respond(body, range, size, mime_type_for(&name))
}

pub(crate) async fn stream_remote(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some(store) = state.remote.as_ref() else {
        return Err(ApiError::service_unavailable("remote store is not configured"));
    };
    let metadata = store.metadata(&id).await?;
    let range = match plan(&headers, metadata.size) {
        Ok(range) => range,
        Err(response) => return Ok(response),
    };
    let body = store.read(&id, range).await?;
    respond(body, range, metadata.size, &metadata.mime_type)
}

/// Resolve the `Range` header, or produce the 416 response for it.
fn plan(headers: &HeaderMap, size: u64) -> Result<Option<ByteRange>, Response> {
    let header = headers.get(RANGE).and_then(|value| value.to_str().ok());
    match resolve_range(header, size) {
        RangeRequest::Full => Ok(None),
        RangeRequest::Partial(range) => Ok(Some(range)),
        RangeRequest::Unsatisfiable => {
            debug!(range = ?header, size, "unsatisfiable range requested");
            let mut response = ApiError::range_not_satisfiable().into_response();
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{size}")) {
                response.headers_mut().insert(CONTENT_RANGE, value);
            }
            Err(response)
        }
    }
}

fn respond(
    body: ByteStream,
    range: Option<ByteRange>,
    size: u64,
    mime_type: &str,
) -> Result<Response, ApiError> {
    let builder = Response::builder()
        .header(ACCEPT_RANGES, ACCEPT_RANGES_BYTES)
        .header(CONTENT_TYPE, mime_type);
    let builder = match range {
        Some(range) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(CONTENT_LENGTH, range.len())
            .header(CONTENT_RANGE, range.content_range(size)),
        None => builder
            .status(StatusCode::OK)
            .header(CONTENT_LENGTH, size),
    };
    builder.body(Body::from_stream(body)).map_err(|err| {
        error!(error = %err, "failed to build stream response");
        ApiError::internal("failed to build stream response")
    })
}
