use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::llm::{build_embedding_provider, build_llm_provider, EmbeddingProvider, LlmProvider};
use crate::rag::{DocumentLoader, PdfLoader, RagChatbot};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Holds the resolved paths and settings plus the chatbot, which owns the
/// active vector index and conversation.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Settings,
    pub chatbot: Arc<RagChatbot>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Loading `.env`
    /// 2. Loading, validating and typing the configuration
    /// 3. Building the LLM and embedding clients
    pub async fn initialize(mut paths: AppPaths) -> Result<Arc<Self>, InitializationError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!("Failed to read .env: {}", err),
        }

        let settings = ConfigService::new(Arc::new(paths.clone())).load_settings()?;
        if let Some(upload_dir) = settings.server.upload_dir.as_deref() {
            paths.set_upload_dir(upload_dir);
        }
        let paths = Arc::new(paths);
        let config = ConfigService::new(paths.clone());

        let llm = build_llm_provider(&settings.llm).map_err(InitializationError::Provider)?;
        let embeddings = build_embedding_provider(&settings.embeddings)
            .map_err(InitializationError::Provider)?;

        let llm_check = llm.clone();
        tokio::spawn(async move {
            match llm_check.health_check().await {
                Ok(true) => tracing::info!("LLM endpoint is reachable"),
                Ok(false) => tracing::warn!("LLM endpoint did not report healthy"),
                Err(e) => tracing::warn!("LLM health check failed: {}", e),
            }
        });

        Self::from_parts(paths, config, settings, llm, embeddings, Arc::new(PdfLoader))
    }

    /// Assembles state from already-built parts.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: Settings,
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        loader: Arc<dyn DocumentLoader>,
    ) -> Result<Arc<Self>, InitializationError> {
        let chatbot = RagChatbot::new(llm, embeddings, loader, settings.clone())
            .map_err(InitializationError::Chatbot)?;

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            chatbot: Arc::new(chatbot),
        }))
    }
}
