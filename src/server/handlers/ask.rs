use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

const NO_QUESTION: &str = "No question provided";

/// `POST /ask` with `{"question": "..."}`. The body is parsed by hand so a
/// malformed payload gets the same 400 as a missing question.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let question = extract_question(&body)
        .ok_or_else(|| ApiError::BadRequest(NO_QUESTION.to_string()))?;

    tracing::info!("Question received ({} chars)", question.chars().count());
    let answer = state.chatbot.ask(&question).await;
    Ok(Json(json!({"answer": answer})))
}

fn extract_question(body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    payload.get("question")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_must_be_a_string() {
        assert_eq!(
            extract_question(br#"{"question": "What is covered?"}"#).as_deref(),
            Some("What is covered?")
        );
        assert_eq!(extract_question(br#"{"question": ""}"#).as_deref(), Some(""));
        assert!(extract_question(br#"{"question": 42}"#).is_none());
        assert!(extract_question(br#"{"query": "hi"}"#).is_none());
        assert!(extract_question(b"not json").is_none());
        assert!(extract_question(b"").is_none());
    }
}
