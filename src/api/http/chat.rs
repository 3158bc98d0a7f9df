// src/api/http/chat.rs

use async_stream::stream;
use axum::{extract::State, response::Response, Json};
use futures::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use super::ndjson_response;
use crate::api::error::{ApiError, ApiResult};
use crate::chat::ChatRequest;
use crate::state::AppState;

/// Stream one chat answer as NDJSON events.
///
/// The request is cancelled by `POST /stop/{id}`, `POST /stop`, or by the
/// client dropping the connection.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Response> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }

    let request_id = Uuid::new_v4().to_string();
    let guard = state.active.register(request_id.clone());
    let cancel = guard.token();
    info!("Chat {} started ({} history messages)", request_id, request.history.len());

    let events = state.orchestrator.run(request, cancel.clone());
    // Dropping the body (client gone) cancels the request and unregisters it
    let disconnect = cancel.drop_guard();

    let lines = stream! {
        let _guard = guard;
        let _disconnect = disconnect;
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            debug!("Chat event: {:?}", event);
            yield event.to_ndjson();
        }
    };

    ndjson_response(lines, Some(&request_id))
}
