//! Exact in-memory similarity index over embedded chunks.
//!
//! Built once per upload and never mutated afterwards; a new upload builds a
//! new index and the chatbot swaps it in.

use serde::{Deserialize, Serialize};

use super::splitter::TextChunk;
use crate::core::config::DistanceMetric;
use crate::core::errors::RagError;
use crate::vector_math;

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSearchResult {
    pub chunk: TextChunk,
    /// Distance for euclidean indexes (lower is better), similarity for
    /// cosine indexes (higher is better).
    pub score: f32,
}

#[derive(Debug)]
pub struct VectorIndex {
    metric: DistanceMetric,
    dimension: usize,
    chunks: Vec<TextChunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn build(
        metric: DistanceMetric,
        chunks: Vec<TextChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, RagError> {
        if chunks.len() != vectors.len() {
            return Err(RagError::EmbeddingCount {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }
        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension || v.is_empty()) {
            return Err(RagError::Dimension {
                expected: dimension,
                actual: bad.len(),
            });
        }

        Ok(Self {
            metric,
            dimension,
            chunks,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Number of distinct source files behind the indexed chunks.
    pub fn source_count(&self) -> usize {
        let mut sources: Vec<&str> = self.chunks.iter().map(|c| c.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }

    /// Returns up to `k` chunks nearest to `query`, best first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ChunkSearchResult>, RagError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let ranked = vector_math::rank(self.metric, query, &self.vectors)?;
        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| ChunkSearchResult {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str) -> TextChunk {
        TextChunk {
            text: text.to_string(),
            source: source.to_string(),
            page: 0,
            chunk_index: 0,
        }
    }

    fn sample_index(metric: DistanceMetric) -> VectorIndex {
        VectorIndex::build(
            metric,
            vec![
                chunk("cats purr", "a.pdf"),
                chunk("dogs bark", "a.pdf"),
                chunk("stocks fell", "b.pdf"),
                chunk("bonds rose", "b.pdf"),
                chunk("kittens nap", "c.pdf"),
            ],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.7, 0.7, 0.0],
                vec![0.0, 0.0, 1.0],
                vec![0.0, 0.1, 0.9],
                vec![0.9, 0.1, 0.0],
            ],
        )
        .expect("valid index")
    }

    #[test]
    fn search_returns_top_k_nearest_first() {
        let index = sample_index(DistanceMetric::Euclidean);
        let hits = index.search(&[1.0, 0.0, 0.0], 4).expect("search");

        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["cats purr", "kittens nap", "dogs bark", "bonds rose"]);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn cosine_search_orders_by_similarity() {
        let index = sample_index(DistanceMetric::Cosine);
        let hits = index.search(&[0.0, 0.0, 2.0], 2).expect("search");

        assert_eq!(hits[0].chunk.text, "stocks fell");
        assert_eq!(hits[1].chunk.text, "bonds rose");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let index = sample_index(DistanceMetric::Euclidean);
        assert_eq!(index.search(&[0.0, 1.0, 0.0], 50).expect("search").len(), 5);
        assert_eq!(index.source_count(), 3);
        assert_eq!(index.dimension(), 3);
    }

    #[test]
    fn build_rejects_inconsistent_inputs() {
        let err = VectorIndex::build(
            DistanceMetric::Euclidean,
            vec![chunk("one", "a"), chunk("two", "a")],
            vec![vec![1.0]],
        )
        .expect_err("count mismatch");
        assert!(matches!(err, RagError::EmbeddingCount { expected: 2, actual: 1 }));

        let err = VectorIndex::build(
            DistanceMetric::Euclidean,
            vec![chunk("one", "a"), chunk("two", "a")],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .expect_err("dimension mismatch");
        assert!(matches!(err, RagError::Dimension { expected: 2, actual: 1 }));
    }

    #[test]
    fn query_with_wrong_dimension_fails() {
        let index = sample_index(DistanceMetric::Euclidean);
        assert!(index.search(&[1.0, 0.0], 4).is_err());
    }
}
