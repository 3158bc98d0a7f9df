// src/api/http/handlers.rs

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Backend liveness plus reachability of the model server and vector index
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let (model_up, index_up) = tokio::join!(state.transport.ping(), state.index.ping());

    Json(json!({
        "status": "online",
        "version": env!("CARGO_PKG_VERSION"),
        "ollama": if model_up { "connected" } else { "disconnected" },
        "index": if index_up.is_ok() { "connected" } else { "disconnected" },
    }))
}

/// Cancel every in-flight chat
pub async fn stop_all_handler(State(state): State<AppState>) -> Json<Value> {
    let cancelled = state.active.cancel_all();
    info!("Stop requested for all chats ({} active)", cancelled);
    Json(json!({ "status": "stopped", "cancelled": cancelled }))
}

/// Cancel one chat by the id returned in its `x-request-id` header
pub async fn stop_handler(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !state.active.cancel(&request_id) {
        return Err(ApiError::not_found(format!("No active request {request_id}")));
    }
    info!("Stop requested for chat {}", request_id);
    Ok(Json(json!({ "status": "stopped", "id": request_id })))
}
