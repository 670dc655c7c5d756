//! Hugging Face Inference API client.
//!
//! Text generation posts to `/models/{repo_id}` and embeddings to
//! `/pipeline/feature-extraction/{model}`. Both authenticate with the hub
//! token as a bearer credential.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, LlmProvider};
use super::types::GenerationRequest;
use crate::core::errors::RagError;

const PROVIDER_NAME: &str = "huggingface";

#[derive(Clone)]
pub struct HuggingFaceProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HuggingFaceProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.trim_matches('/').to_string(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, RagError> {
        let res = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await?;
        read_json(res).await
    }
}

async fn read_json(res: Response) -> Result<Value, RagError> {
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(RagError::provider(
            PROVIDER_NAME,
            format!("{}: {}", status, error_detail(&text)),
        ));
    }
    Ok(res.json().await?)
}

/// Pulls `error` out of a JSON error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn parse_generated_text(payload: &Value) -> Result<String, RagError> {
    if let Some(message) = payload.get("error").and_then(Value::as_str) {
        return Err(RagError::provider(PROVIDER_NAME, message));
    }

    let entry = match payload {
        Value::Array(items) => items.first(),
        other => Some(other),
    };

    entry
        .and_then(|e| e.get("generated_text"))
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            RagError::provider(PROVIDER_NAME, format!("unexpected generation response: {}", payload))
        })
}

/// Accepts sentence vectors (`[[f32]]`) or token vectors (`[[[f32]]]`),
/// mean-pooling the latter into one vector per input.
fn parse_feature_vectors(payload: &Value) -> Result<Vec<Vec<f32>>, RagError> {
    let items = payload.as_array().ok_or_else(|| {
        RagError::provider(PROVIDER_NAME, format!("unexpected embedding response: {}", payload))
    })?;

    items
        .iter()
        .map(|item| match item.as_array() {
            Some(values) if values.first().is_some_and(Value::is_array) => {
                let tokens = values
                    .iter()
                    .map(number_vector)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(mean_pool(&tokens))
            }
            Some(_) => number_vector(item),
            None => Err(RagError::provider(
                PROVIDER_NAME,
                "embedding entry is not an array",
            )),
        })
        .collect()
}

fn number_vector(value: &Value) -> Result<Vec<f32>, RagError> {
    let values = value
        .as_array()
        .ok_or_else(|| RagError::provider(PROVIDER_NAME, "embedding entry is not an array"))?;
    values
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                RagError::provider(PROVIDER_NAME, format!("embedding values are not numeric: {}", v))
            })
        })
        .collect()
}

fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let dim = tokens.first().map(Vec::len).unwrap_or(0);
    let mut pooled = vec![0.0f32; dim];
    for token in tokens {
        for (acc, v) in pooled.iter_mut().zip(token) {
            *acc += v;
        }
    }
    let count = tokens.len().max(1) as f32;
    pooled.iter_mut().for_each(|v| *v /= count);
    pooled
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn health_check(&self) -> Result<bool, RagError> {
        let url = format!("{}/models/{}", self.base_url, self.model);
        match self.authorized(self.client.get(&url)).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError> {
        let url = format!("{}/models/{}", self.base_url, self.model);

        let mut parameters = json!({ "return_full_text": false });
        if let Some(obj) = parameters.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(n) = request.max_new_tokens {
                obj.insert("max_new_tokens".to_string(), json!(n));
            }
            if let Some(s) = request.stop {
                obj.insert("stop".to_string(), json!(s));
            }
        }

        let body = json!({
            "inputs": request.prompt,
            "parameters": parameters,
            "options": { "wait_for_model": true },
        });

        let payload = self.post_json(&url, &body).await?;
        parse_generated_text(&payload)
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!(
            "{}/pipeline/feature-extraction/{}",
            self.base_url, self.model
        );
        let body = json!({
            "inputs": inputs,
            "options": { "wait_for_model": true },
        });

        let payload = self.post_json(&url, &body).await?;
        let vectors = parse_feature_vectors(&payload)?;
        if vectors.len() != inputs.len() {
            return Err(RagError::EmbeddingCount {
                expected: inputs.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}
