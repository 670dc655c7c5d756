//! Typed view over the merged YAML configuration.
//!
//! Every field has a default so an empty `config.yml` yields a working
//! Hugging Face setup (`google/flan-t5-base` for generation,
//! `all-MiniLM-L6-v2` for embeddings).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ConfigError;

pub const HF_TOKEN_ENV: &str = "HUGGINGFACEHUB_API_TOKEN";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

const HF_INFERENCE_URL: &str = "https://api-inference.huggingface.co";
const OPENAI_COMPATIBLE_URL: &str = "http://localhost:1234";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[serde(alias = "hf", alias = "hugging_face")]
    Huggingface,
    #[serde(alias = "openai_compatible", alias = "lmstudio")]
    Openai,
}

impl ProviderKind {
    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Huggingface => HF_INFERENCE_URL,
            ProviderKind::Openai => OPENAI_COMPATIBLE_URL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[serde(alias = "l2")]
    Euclidean,
    Cosine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub upload_dir: Option<String>,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_dir: None,
            max_upload_bytes: 64 * 1024 * 1024,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Number of chunks sent per embedding request.
    pub embed_batch_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            embed_batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub distance: DistanceMetric,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            distance: DistanceMetric::Euclidean,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Huggingface,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            base_url: None,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl EmbeddingSettings {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    #[serde(alias = "repo_id")]
    pub model: String,
    pub task: String,
    pub temperature: f64,
    pub max_new_tokens: u32,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Huggingface,
            model: "google/flan-t5-base".to_string(),
            task: "text2text-generation".to_string(),
            temperature: 0.1,
            max_new_tokens: 512,
            base_url: None,
            api_key: None,
            timeout_secs: 120,
        }
    }
}

impl LlmSettings {
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub ingest: IngestSettings,
    pub retrieval: RetrievalSettings,
    pub embeddings: EmbeddingSettings,
    pub llm: LlmSettings,
}

impl Settings {
    /// Builds settings from an already validated config value, then applies
    /// environment overrides through `lookup`.
    pub fn from_config<F>(config: &Value, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings: Settings = serde_json::from_value(config.clone())?;
        settings.apply_env(lookup)?;
        Ok(settings)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                path: "PORT".to_string(),
                message: format!("'{}' is not a valid port", port),
            })?;
        }

        let hf_token = non_empty(HF_TOKEN_ENV);
        let openai_key = non_empty(OPENAI_KEY_ENV);

        for (kind, api_key) in [
            (self.embeddings.provider, &mut self.embeddings.api_key),
            (self.llm.provider, &mut self.llm.api_key),
        ] {
            if api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
                continue;
            }
            match kind {
                ProviderKind::Huggingface => {
                    let token = hf_token
                        .clone()
                        .ok_or(ConfigError::MissingCredential(HF_TOKEN_ENV))?;
                    *api_key = Some(token);
                }
                ProviderKind::Openai => *api_key = openai_key.clone(),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let settings =
            Settings::from_config(&json!({}), env_of(&[(HF_TOKEN_ENV, "hf_abc")])).expect("settings");

        assert_eq!(settings.ingest.chunk_size, 1000);
        assert_eq!(settings.ingest.chunk_overlap, 200);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.retrieval.distance, DistanceMetric::Euclidean);
        assert_eq!(settings.llm.model, "google/flan-t5-base");
        assert!((settings.llm.temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(settings.llm.max_new_tokens, 512);
        assert_eq!(settings.llm.api_key.as_deref(), Some("hf_abc"));
        assert_eq!(settings.embeddings.api_key.as_deref(), Some("hf_abc"));
        assert_eq!(settings.llm.base_url(), HF_INFERENCE_URL);
    }

    #[test]
    fn missing_token_is_rejected_for_huggingface() {
        let err = Settings::from_config(&json!({}), env_of(&[])).expect_err("should fail");
        assert!(matches!(err, ConfigError::MissingCredential(HF_TOKEN_ENV)));
    }

    #[test]
    fn openai_providers_do_not_need_a_token() {
        let config = json!({
            "llm": { "provider": "lmstudio", "repo_id": "qwen2.5-7b-instruct" },
            "embeddings": { "provider": "openai", "model": "nomic-embed-text" }
        });
        let settings = Settings::from_config(&config, env_of(&[])).expect("settings");

        assert_eq!(settings.llm.provider, ProviderKind::Openai);
        assert_eq!(settings.llm.model, "qwen2.5-7b-instruct");
        assert_eq!(settings.llm.api_key, None);
        assert_eq!(settings.embeddings.base_url(), OPENAI_COMPATIBLE_URL);
    }

    #[test]
    fn env_overrides_host_and_port() {
        let config = json!({ "server": { "port": 8000 } });
        let settings = Settings::from_config(
            &config,
            env_of(&[(HF_TOKEN_ENV, "t"), ("PORT", "9123"), ("HOST", "0.0.0.0")]),
        )
        .expect("settings");

        assert_eq!(settings.server.port, 9123);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn configured_api_key_wins_over_env() {
        let config = json!({ "llm": { "api_key": "from-secrets" } });
        let settings =
            Settings::from_config(&config, env_of(&[(HF_TOKEN_ENV, "from-env")])).expect("settings");

        assert_eq!(settings.llm.api_key.as_deref(), Some("from-secrets"));
        assert_eq!(settings.embeddings.api_key.as_deref(), Some("from-env"));
    }
}
