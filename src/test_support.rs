//! Shared fakes for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;

use crate::core::errors::RagError;
use crate::llm::{EmbeddingProvider, GenerationRequest, LlmProvider};

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let addr = listener.local_addr().expect("mock server addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

pub const FAKE_DIM: usize = 256;

/// Bag-of-words embedding over a vocabulary grown on first sight, so texts
/// sharing words land close and unrelated words never collide.
#[derive(Default)]
pub struct VocabEmbeddings {
    vocab: Mutex<HashMap<String, usize>>,
    pub calls: Mutex<Vec<usize>>,
}

impl VocabEmbeddings {
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vocab = self.vocab.lock().expect("lock");
        let mut vector = vec![0.0f32; FAKE_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let next = vocab.len();
            let slot = *vocab.entry(word.to_lowercase()).or_insert(next) % FAKE_DIM;
            vector[slot] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for VocabEmbeddings {
    fn name(&self) -> &str {
        "vocab"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.calls.lock().expect("lock").push(inputs.len());
        Ok(inputs.iter().map(|text| self.embed_text(text)).collect())
    }
}

/// Drops the last vector of every batch once `short` is set.
#[derive(Default)]
pub struct ShortEmbeddings {
    inner: VocabEmbeddings,
    pub short: AtomicBool,
}

#[async_trait]
impl EmbeddingProvider for ShortEmbeddings {
    fn name(&self) -> &str {
        "short"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut vectors = self.inner.embed(inputs).await?;
        if self.short.load(Ordering::SeqCst) {
            vectors.pop();
        }
        Ok(vectors)
    }
}

pub struct FailingEmbeddings;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddings {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Err(RagError::provider("failing", "embedding service unreachable"))
    }
}

/// Replies with queued answers in order and records every prompt.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::default(),
        }
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .expect("lock")
            .push_back(Err(message.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("lock").clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool, RagError> {
        Ok(true)
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, RagError> {
        self.prompts.lock().expect("lock").push(request.prompt);
        match self.replies.lock().expect("lock").pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(RagError::provider("scripted", message)),
            None => Ok("no scripted reply".to_string()),
        }
    }
}
