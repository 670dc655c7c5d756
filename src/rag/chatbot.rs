//! The chatbot: one active retrieval chain, rebuilt on every upload.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::chain::{ConversationalRetrievalChain, SourceRef};
use super::loader::{load_all, DocumentLoader, SkippedFile};
use super::splitter::{RecursiveCharacterSplitter, TextChunk};
use super::store::VectorIndex;
use crate::core::config::{LlmSettings, Settings};
use crate::core::errors::RagError;
use crate::llm::{EmbeddingProvider, LlmProvider};

pub const NOT_READY_MESSAGE: &str = "Please upload PDFs first.";

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub pages: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatbotStatus {
    pub ready: bool,
    pub files: usize,
    pub chunks: usize,
    pub memory_turns: usize,
    pub ingested_at: Option<DateTime<Utc>>,
    pub llm_provider: String,
    pub embedding_provider: String,
}

struct ActiveIndex {
    chain: Arc<ConversationalRetrievalChain>,
    ingested_at: DateTime<Utc>,
}

pub struct RagChatbot {
    llm: Arc<dyn LlmProvider>,
    embeddings: Arc<dyn EmbeddingProvider>,
    loader: Arc<dyn DocumentLoader>,
    splitter: RecursiveCharacterSplitter,
    settings: Settings,
    active: RwLock<Option<ActiveIndex>>,
}

impl RagChatbot {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        loader: Arc<dyn DocumentLoader>,
        settings: Settings,
    ) -> Result<Self, RagError> {
        let splitter = RecursiveCharacterSplitter::new(
            settings.ingest.chunk_size,
            settings.ingest.chunk_overlap,
        )?;
        Ok(Self {
            llm,
            embeddings,
            loader,
            splitter,
            settings,
            active: RwLock::new(None),
        })
    }

    fn generation(&self) -> LlmSettings {
        self.settings.llm.clone()
    }

    /// Loads, splits and embeds `paths`, then replaces the active index and
    /// conversation. Files that fail to load are skipped; if nothing loads
    /// the previous index stays active.
    pub async fn ingest_pdfs(&self, paths: &[PathBuf]) -> Result<IngestReport, RagError> {
        let report = load_all(self.loader.clone(), paths).await;
        let pages = report.documents.len();

        let chunks = self.splitter.split_documents(&report.documents);
        if chunks.is_empty() {
            tracing::warn!(
                "Ingestion produced no text ({} file(s) skipped)",
                report.skipped.len()
            );
            return Err(RagError::NoDocuments);
        }

        let vectors = self.embed_chunks(&chunks).await?;
        let chunk_count = chunks.len();
        let index = VectorIndex::build(self.settings.retrieval.distance, chunks, vectors)?;

        let chain = ConversationalRetrievalChain::new(
            self.llm.clone(),
            self.embeddings.clone(),
            Arc::new(index),
            self.settings.retrieval.top_k,
            self.generation(),
        );

        *self.active.write().await = Some(ActiveIndex {
            chain: Arc::new(chain),
            ingested_at: Utc::now(),
        });

        tracing::info!(
            "Indexed {} chunk(s) from {} page(s) across {} file(s)",
            chunk_count,
            pages,
            report.loaded_files
        );

        Ok(IngestReport {
            files: report.loaded_files,
            pages,
            chunks: chunk_count,
            skipped: report.skipped,
        })
    }

    async fn embed_chunks(&self, chunks: &[TextChunk]) -> Result<Vec<Vec<f32>>, RagError> {
        let batch_size = self.settings.ingest.embed_batch_size.max(1);
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self.embeddings.embed(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(RagError::EmbeddingCount {
                    expected: texts.len(),
                    actual: embedded.len(),
                });
            }
            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    async fn current_chain(&self) -> Option<Arc<ConversationalRetrievalChain>> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|active| active.chain.clone())
    }

    /// Answers `question`. Never fails: errors come back as answer text.
    pub async fn ask(&self, question: &str) -> String {
        self.ask_with_sources(question).await.answer
    }

    pub async fn ask_with_sources(&self, question: &str) -> AskOutcome {
        let Some(chain) = self.current_chain().await else {
            return AskOutcome {
                answer: NOT_READY_MESSAGE.to_string(),
                sources: Vec::new(),
            };
        };

        match chain.invoke(question).await {
            Ok(output) => AskOutcome {
                answer: output.answer,
                sources: output.sources,
            },
            Err(err) => {
                tracing::error!("Question answering failed: {}", err);
                AskOutcome {
                    answer: format!("An error occurred: {}", err),
                    sources: Vec::new(),
                }
            }
        }
    }

    /// Forgets the conversation but keeps the indexed documents.
    pub async fn clear_history(&self) -> bool {
        match self.current_chain().await {
            Some(chain) => {
                chain.clear_memory().await;
                true
            }
            None => false,
        }
    }

    pub async fn status(&self) -> ChatbotStatus {
        let guard = self.active.read().await;
        let (ready, files, chunks, memory_turns, ingested_at) = match guard.as_ref() {
            Some(active) => (
                true,
                active.chain.index().source_count(),
                active.chain.index().len(),
                active.chain.memory_len().await,
                Some(active.ingested_at),
            ),
            None => (false, 0, 0, 0, None),
        };

        ChatbotStatus {
            ready,
            files,
            chunks,
            memory_turns,
            ingested_at,
            llm_provider: self.llm.name().to_string(),
            embedding_provider: self.embeddings.name().to_string(),
        }
    }
}
