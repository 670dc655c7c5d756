//! Document loading for the ingestion path.
//!
//! PDFs are read page by page; a file that fails to load is logged and
//! skipped so the rest of an upload still gets indexed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// One page of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    /// Path the text was read from.
    pub source: String,
    /// Zero-based page number.
    pub page: usize,
}

pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<Document>, RagError>;
}

/// Text extraction backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Document>, RagError> {
        let source = path.display().to_string();
        let pages = pdf_extract::extract_text_by_pages(path).map_err(|e| RagError::Load {
            path: source.clone(),
            message: e.to_string(),
        })?;

        Ok(pages
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(page, content)| Document {
                content,
                source: source.clone(),
                page,
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub loaded_files: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Loads every path in order on the blocking pool.
///
/// Extraction errors and extractor panics both skip the file.
pub async fn load_all(loader: Arc<dyn DocumentLoader>, paths: &[PathBuf]) -> LoadReport {
    let mut report = LoadReport::default();

    for path in paths {
        let task_loader = loader.clone();
        let task_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || task_loader.load(&task_path))
            .await
            .map_err(RagError::from)
            .and_then(|result| result);

        match outcome {
            Ok(documents) => {
                tracing::debug!(
                    "Loaded {} page(s) from {}",
                    documents.len(),
                    path.display()
                );
                report.loaded_files += 1;
                report.documents.extend(documents);
            }
            Err(err) => {
                tracing::warn!("Skipping {}: {}", path.display(), err);
                report.skipped.push(SkippedFile {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    report
}
