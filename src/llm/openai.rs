use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::{EmbeddingProvider, LlmProvider};
use super::types::{ChatMessage, GenerationRequest};
use crate::core::errors::RagError;

const PROVIDER_NAME: &str = "openai";

/// OpenAI-compatible server (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value, RagError> {
        let res = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::provider(
                PROVIDER_NAME,
                format!("{}: {}", status, text.trim()),
            ));
        }

        Ok(res.json().await?)
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn health_check(&self) -> Result<bool, RagError> {
        let url = format!("{}/v1/models", self.base_url);
        match self.authorized(self.client.get(&url)).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": self.model,
            "messages": [ChatMessage::user(request.prompt)],
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_new_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
            if let Some(s) = request.stop {
                obj.insert("stop".to_string(), json!(s));
            }
        }

        let payload = self.post(&url, &body).await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                RagError::provider(PROVIDER_NAME, format!("unexpected chat response: {}", payload))
            })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let payload = self.post(&url, &body).await?;
        let mut response: EmbeddingsResponse = serde_json::from_value(payload)
            .map_err(|e| RagError::provider(PROVIDER_NAME, e.to_string()))?;

        // Servers may return items out of order; `index` is authoritative.
        response
            .data
            .sort_by_key(|item| item.index.unwrap_or(usize::MAX));

        if response.data.len() != inputs.len() {
            return Err(RagError::EmbeddingCount {
                expected: inputs.len(),
                actual: response.data.len(),
            });
        }
        Ok(response.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    use super::*;
    use crate::test_support::serve;

    async fn mock_server() -> String {
        let router = Router::new()
            .route(
                "/v1/chat/completions",
                post(|Json(body): Json<Value>| async move {
                    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
                    let max_tokens = body["max_tokens"].clone();
                    Json(json!({
                        "choices": [{ "message": { "role": "assistant", "content": format!(" echo:{} max:{} ", prompt, max_tokens) } }]
                    }))
                }),
            )
            .route(
                "/v1/embeddings",
                post(|Json(body): Json<Value>| async move {
                    let count = body["input"].as_array().map(Vec::len).unwrap_or(0);
                    let data: Vec<Value> = (0..count)
                        .rev()
                        .map(|i| json!({ "index": i, "embedding": [i as f32, 0.0] }))
                        .collect();
                    Json(json!({ "data": data }))
                }),
            )
            .route("/v1/models", get(|| async { Json(json!({ "data": [] })) }));
        serve(router).await
    }

    fn provider(base: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(base, "local-model", None, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn chat_completion_maps_prompt_and_limits() {
        let base = mock_server().await;
        let request = GenerationRequest {
            prompt: "hello".to_string(),
            temperature: Some(0.2),
            max_new_tokens: Some(64),
            stop: None,
        };

        let answer = provider(&base).generate(request).await.expect("generate");
        assert_eq!(answer, "echo:hello max:64");
        assert!(provider(&base).health_check().await.expect("health"));
    }

    #[tokio::test]
    async fn embeddings_are_reordered_by_index() {
        let base = mock_server().await;
        let inputs: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let vectors = provider(&base).embed(&inputs).await.expect("embed");
        assert_eq!(vectors, vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]]);
    }

    #[tokio::test]
    async fn embeddings_count_mismatch_is_an_error() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { Json(json!({ "data": [{ "index": 0, "embedding": [1.0, 0.0] }] })) }),
        );
        let base = serve(router).await;
        let inputs = vec!["a".to_string(), "b".to_string()];

        let err = provider(&base).embed(&inputs).await.expect_err("two inputs, one vector");
        assert!(
            matches!(err, RagError::EmbeddingCount { expected: 2, actual: 1 }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::BAD_REQUEST, "model not loaded") }),
        );
        let base = serve(router).await;

        let err = provider(&base)
            .generate(GenerationRequest::new("hi"))
            .await
            .expect_err("400 must fail");
        assert!(err.to_string().contains("model not loaded"));
    }
}
