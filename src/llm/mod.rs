pub mod huggingface;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAiCompatibleProvider;
pub use provider::{EmbeddingProvider, LlmProvider};
pub use types::{ChatMessage, GenerationRequest};

use crate::core::config::{EmbeddingSettings, LlmSettings, ProviderKind};
use crate::core::errors::RagError;

pub fn build_llm_provider(settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>, RagError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let provider: Arc<dyn LlmProvider> = match settings.provider {
        ProviderKind::Huggingface => {
            if settings.task != "text2text-generation" && settings.task != "text-generation" {
                tracing::warn!(
                    "Unsupported Hugging Face task '{}'; sending a plain generation request",
                    settings.task
                );
            }
            Arc::new(HuggingFaceProvider::new(
                settings.base_url(),
                &settings.model,
                settings.api_key.clone(),
                timeout,
            )?)
        }
        ProviderKind::Openai => Arc::new(OpenAiCompatibleProvider::new(
            settings.base_url(),
            &settings.model,
            settings.api_key.clone(),
            timeout,
        )?),
    };
    tracing::info!(
        "LLM provider: {} ({}) at {}",
        provider.name(),
        settings.model,
        settings.base_url()
    );
    Ok(provider)
}

pub fn build_embedding_provider(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    let timeout = Duration::from_secs(settings.timeout_secs);
    let provider: Arc<dyn EmbeddingProvider> = match settings.provider {
        ProviderKind::Huggingface => Arc::new(HuggingFaceProvider::new(
            settings.base_url(),
            &settings.model,
            settings.api_key.clone(),
            timeout,
        )?),
        ProviderKind::Openai => Arc::new(OpenAiCompatibleProvider::new(
            settings.base_url(),
            &settings.model,
            settings.api_key.clone(),
            timeout,
        )?),
    };
    tracing::info!(
        "Embedding provider: {} ({}) at {}",
        provider.name(),
        settings.model,
        settings.base_url()
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factories_select_configured_backend() {
        let llm = build_llm_provider(&LlmSettings::default()).expect("hf llm");
        assert_eq!(llm.name(), "huggingface");

        let embeddings = build_embedding_provider(&EmbeddingSettings {
            provider: ProviderKind::Openai,
            ..EmbeddingSettings::default()
        })
        .expect("openai embeddings");
        assert_eq!(embeddings.name(), "openai");
    }
}
