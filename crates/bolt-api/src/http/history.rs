//! History log handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use bolt_transfer_core::HistoryEntry;

use crate::http::errors::ApiError;
use crate::models::HistoryDeleteResponse;
use crate::state::ApiState;

pub(crate) async fn list_history(State(state): State<Arc<ApiState>>) -> Json<Vec<HistoryEntry>> {
    Json(state.inspector.history().await)
}

pub(crate) async fn delete_history(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Result<Json<HistoryDeleteResponse>, ApiError> {
    let removal = state.workflow.remove_history(&name).await?;
    let success = removal.entries_removed > 0 || removal.artifact_deleted;
    let message = match (removal.entries_removed, removal.artifact_deleted) {
        (0, false) => format!("no history entry named {name}"),
        (_, true) => format!("removed {name} and its local file"),
        (_, false) => format!("removed {name}"),
    };
    Ok(Json(HistoryDeleteResponse {
        success,
        message: Some(message),
    }))
}
