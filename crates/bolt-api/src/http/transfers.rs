//! Transfer lifecycle handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

use bolt_transfer_core::{TransferRequest, TransferSnapshot};

use crate::http::errors::ApiError;
use crate::models::{StartTransferRequest, StartTransferResponse};
use crate::state::ApiState;

pub(crate) async fn start_transfer(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<StartTransferRequest>,
) -> Result<(StatusCode, Json<StartTransferResponse>), ApiError> {
    let request = TransferRequest::from(request);
    let download_id = state.workflow.start(request).await?;
    info!(download_id = %download_id, "transfer accepted");
    Ok((
        StatusCode::ACCEPTED,
        Json(StartTransferResponse { download_id }),
    ))
}

pub(crate) async fn list_transfers(
    State(state): State<Arc<ApiState>>,
) -> Json<Vec<TransferSnapshot>> {
    Json(state.inspector.list().await)
}

pub(crate) async fn pause_transfer(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.workflow.pause(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn resume_transfer(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.workflow.resume(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn cancel_transfer(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.workflow.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
