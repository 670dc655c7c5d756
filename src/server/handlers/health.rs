use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chatbot.status().await)
}

/// Drops the conversation memory; the indexed documents stay.
pub async fn clear_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.chatbot.clear_history().await;
    if cleared {
        tracing::info!("Conversation history cleared");
    }
    Json(json!({"cleared": cleared}))
}
