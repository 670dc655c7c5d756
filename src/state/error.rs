use thiserror::Error;

use crate::core::errors::{ConfigError, RagError};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize model provider: {0}")]
    Provider(#[source] RagError),

    #[error("Failed to initialize chatbot: {0}")]
    Chatbot(#[source] RagError),
}
