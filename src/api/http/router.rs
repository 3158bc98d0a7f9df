// src/api/http/router.rs

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{
    chat::chat_handler,
    handlers::{health_handler, stop_all_handler, stop_handler},
    vault::{search_handler, sync_handler},
};
use crate::state::AppState;

pub fn http_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Chat
        .route("/chat", post(chat_handler))
        .route("/stop", post(stop_all_handler))
        .route("/stop/{id}", post(stop_handler))
        // Vault
        .route("/vault/sync", post(sync_handler))
        .route("/vault/search", post(search_handler))
        .layer(TraceLayer::new_for_http())
        // The web UI is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
