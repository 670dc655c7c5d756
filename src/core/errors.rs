use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Failures on the ingestion and question-answering paths.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("failed to load {path}: {message}")]
    Load { path: String, message: String },

    #[error("no text could be extracted from the uploaded PDFs")]
    NoDocuments,

    #[error("invalid splitter settings: {0}")]
    InvalidSplitter(String),

    #[error("{provider} request failed: {message}")]
    Provider { provider: String, message: String },

    #[error("embedding count mismatch: sent {expected} inputs, received {actual} vectors")]
    EmbeddingCount { expected: usize, actual: usize },

    #[error("embedding dimension mismatch: index uses {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl RagError {
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        RagError::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::NoDocuments | RagError::InvalidSplitter(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config at '{path}': {message}")]
    Invalid { path: String, message: String },

    #[error("{0} is not set; add it to the environment or a .env file")]
    MissingCredential(&'static str),

    #[error("failed to deserialize settings: {0}")]
    Deserialize(#[from] serde_json::Error),
}
