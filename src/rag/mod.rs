//! Retrieval-augmented question answering over uploaded PDFs.
//!
//! This module provides:
//! - `PdfLoader`: per-page text extraction
//! - `RecursiveCharacterSplitter`: overlapping chunking
//! - `VectorIndex`: in-memory exhaustive similarity search
//! - `ConversationalRetrievalChain`: condense, retrieve, answer, remember
//! - `RagChatbot`: the active chain, replaced on every upload

pub mod chain;
pub mod chatbot;
pub mod loader;
pub mod memory;
pub mod prompts;
pub mod splitter;
pub mod store;

pub use chain::{ChainOutput, ConversationalRetrievalChain, SourceRef};
pub use chatbot::{AskOutcome, ChatbotStatus, IngestReport, RagChatbot, NOT_READY_MESSAGE};
pub use loader::{Document, DocumentLoader, PdfLoader, SkippedFile};
pub use memory::{ConversationMemory, ConversationTurn};
pub use splitter::{RecursiveCharacterSplitter, TextChunk};
pub use store::{ChunkSearchResult, VectorIndex};
