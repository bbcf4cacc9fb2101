//! `/api/memories` CRUD.

use super::{error_response, rejection_response, DashboardState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use storage::{MemoryPatch, NewMemory, StorageError};
use tracing::error;

pub(super) async fn list_memories(State(state): State<Arc<DashboardState>>) -> Response {
    match state.memories.list_all().await {
        Ok(memories) => Json(memories).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to fetch memories");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch memories",
                Some(e.to_string()),
            )
        }
    }
}

pub(super) async fn create_memory(
    State(state): State<Arc<DashboardState>>,
    payload: Result<Json<NewMemory>, JsonRejection>,
) -> Response {
    let Json(memory) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    if memory.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Memory text cannot be empty", None);
    }
    match state.memories.create(memory).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to create memory");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create memory",
                Some(e.to_string()),
            )
        }
    }
}

pub(super) async fn update_memory(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<String>,
    payload: Result<Json<MemoryPatch>, JsonRejection>,
) -> Response {
    let Json(patch) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejection_response(rejection),
    };
    if patch.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No update fields provided", None);
    }
    match state.memories.update(&id, &patch).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(StorageError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Memory not found", None)
        }
        Err(e) => {
            error!(id = %id, error = %e, "Failed to update memory");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update memory",
                Some(e.to_string()),
            )
        }
    }
}

pub(super) async fn delete_memory(
    State(state): State<Arc<DashboardState>>,
    Path(id): Path<String>,
) -> Response {
    match state.memories.delete(&id).await {
        Ok(_) => Json(json!({ "success": true })).into_response(),
        Err(e) => {
            error!(id = %id, error = %e, "Failed to delete memory");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete memory",
                Some(e.to_string()),
            )
        }
    }
}
