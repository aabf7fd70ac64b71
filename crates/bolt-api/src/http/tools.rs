//! Filename detection and share-link conversion helpers.

use std::sync::Arc;

use axum::{Json, extract::State};

use bolt_transfer_core::links::convert_share_link;

use crate::http::errors::ApiError;
use crate::models::{ConvertLinkResponse, DetectFilenameResponse, UrlRequest};
use crate::state::ApiState;

pub(crate) async fn detect_filename(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UrlRequest>,
) -> Result<Json<DetectFilenameResponse>, ApiError> {
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("url must not be empty"));
    }
    let detection = state.inspector.detect_filename(url).await;
    Ok(Json(DetectFilenameResponse {
        success: true,
        filename: detection.filename,
        source: detection.source,
    }))
}

pub(crate) async fn convert_link(Json(request): Json<UrlRequest>) -> Json<ConvertLinkResponse> {
    let direct_url = convert_share_link(request.url.trim());
    Json(ConvertLinkResponse {
        success: direct_url.is_some(),
        direct_url,
    })
}
