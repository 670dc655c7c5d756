//! Conversational retrieval over one vector index.
//!
//! Follow-up questions are first condensed into standalone questions using
//! the conversation so far, then answered from the top-k retrieved chunks.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use super::memory::ConversationMemory;
use super::prompts;
use super::store::VectorIndex;
use crate::core::config::LlmSettings;
use crate::core::errors::RagError;
use crate::llm::{EmbeddingProvider, GenerationRequest, LlmProvider};

#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub source: String,
    pub page: usize,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct ChainOutput {
    pub answer: String,
    pub standalone_question: String,
    pub sources: Vec<SourceRef>,
}

pub struct ConversationalRetrievalChain {
    llm: Arc<dyn LlmProvider>,
    embeddings: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    memory: Mutex<ConversationMemory>,
    top_k: usize,
    generation: LlmSettings,
}

impl ConversationalRetrievalChain {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        top_k: usize,
        generation: LlmSettings,
    ) -> Self {
        Self {
            llm,
            embeddings,
            index,
            memory: Mutex::new(ConversationMemory::new()),
            top_k,
            generation,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub async fn memory_len(&self) -> usize {
        self.memory.lock().await.len()
    }

    pub async fn clear_memory(&self) {
        self.memory.lock().await.clear();
    }

    pub async fn invoke(&self, question: &str) -> Result<ChainOutput, RagError> {
        let history = self.memory.lock().await.buffer();

        let standalone_question = if history.is_empty() {
            question.to_string()
        } else {
            let condensed = self
                .generate(prompts::condense_question(&history, question))
                .await?;
            if condensed.trim().is_empty() {
                question.to_string()
            } else {
                condensed.trim().to_string()
            }
        };
        tracing::debug!("Standalone question: {}", standalone_question);

        let query_vector = self
            .embeddings
            .embed(std::slice::from_ref(&standalone_question))
            .await?
            .into_iter()
            .next()
            .ok_or(RagError::EmbeddingCount {
                expected: 1,
                actual: 0,
            })?;

        let hits = self.index.search(&query_vector, self.top_k)?;
        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let answer = self
            .generate(prompts::answer_question(&context, &standalone_question))
            .await?;

        self.memory.lock().await.save(question, answer.clone());

        Ok(ChainOutput {
            answer,
            standalone_question,
            sources: hits
                .into_iter()
                .map(|hit| SourceRef {
                    source: hit.chunk.source,
                    page: hit.chunk.page,
                    score: hit.score,
                })
                .collect(),
        })
    }

    async fn generate(&self, prompt: String) -> Result<String, RagError> {
        let request = GenerationRequest::new(prompt).with_settings(&self.generation);
        self.llm.generate(request).await
    }
}
