// src/api/http/vault.rs

use std::path::PathBuf;

use async_stream::stream;
use axum::{body::Bytes, extract::State, response::Response, Json};
use futures::StreamExt;
use serde::Deserialize;
use tracing::info;

use super::ndjson_response;
use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub vault_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Rebuild the index, streaming `SyncEvent`s. One sync at a time.
pub async fn sync_handler(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: SyncRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SyncRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid sync request: {e}")))?
    };

    let root = request
        .vault_path
        .or_else(|| state.config.vault_path.clone())
        .ok_or_else(|| ApiError::bad_request("No vault path given and VAULT_PATH is not set"))?;
    if !root.is_dir() {
        return Err(ApiError::not_found(format!(
            "Vault directory {} does not exist",
            root.display()
        )));
    }

    let permit = state
        .sync_lock
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::conflict("A vault sync is already running"))?;

    info!("Vault sync requested for {}", root.display());
    let events = state.ingestion.sync(root);

    let lines = stream! {
        let _permit = permit;
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            match serde_json::to_string(&event) {
                Ok(mut line) => {
                    line.push('\n');
                    yield line;
                }
                Err(e) => tracing::error!("Failed to encode sync event: {}", e),
            }
        }
    };

    ndjson_response(lines, None)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<Vec<String>>> {
    if request.query.trim().is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }
    let top_k = request.top_k.unwrap_or(state.config.search_top_k).max(1);
    Ok(Json(state.retrieval.search(&request.query, top_k).await))
}
