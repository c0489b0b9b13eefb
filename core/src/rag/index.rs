//! Persisted vector index and cosine ranking

use crate::error::{Result, RetrievalError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Current index file format version
const INDEX_VERSION: u32 = 1;

/// One embedded chunk stored in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Chunk text
    pub text: String,
    /// Identifier of the source document (relative path)
    pub source: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// A chunk returned by a retrieval query. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,
    /// Identifier of the source document
    pub source: String,
    /// Cosine similarity against the query, higher is more relevant
    pub score: f32,
}

/// File-backed vector index.
///
/// Written once by the offline ingestion step, opened read-only at query
/// time. Concurrent queries are safe because nothing mutates a loaded
/// index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Format version
    pub version: u32,
    /// Embedding model the chunks were embedded with
    pub embedding_model: String,
    /// Embedded chunks
    pub chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Create an empty index for the given embedding model
    pub fn new<S: Into<String>>(embedding_model: S) -> Self {
        Self {
            version: INDEX_VERSION,
            embedding_model: embedding_model.into(),
            chunks: Vec::new(),
        }
    }

    /// Add a chunk to the index
    pub fn push(&mut self, chunk: IndexedChunk) {
        self.chunks.push(chunk);
    }

    /// Number of chunks in the index
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index has no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Persist the index to `path`, creating parent directories as needed
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string(self)?;
        fs::write(path, json).await?;
        Ok(())
    }

    /// Open a persisted index read-only.
    ///
    /// A missing or unreadable file means the index was never built (or is
    /// gone) and maps to [`RetrievalError::IndexUnavailable`]; a file that
    /// exists but does not parse maps to [`RetrievalError::InvalidIndex`].
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path)
                .await
                .map_err(|e| RetrievalError::IndexUnavailable {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;

        let index: VectorIndex =
            serde_json::from_str(&content).map_err(|e| RetrievalError::InvalidIndex {
                message: format!("{}: {}", path.display(), e),
            })?;

        Ok(index)
    }

    /// Rank all chunks against `query_embedding` and return the top `k`,
    /// ordered by descending score.
    ///
    /// Ties break on source then text so identical queries against an
    /// unmodified index always return the same sequence.
    pub fn rank(&self, query_embedding: &[f32], k: usize) -> Vec<RetrievedChunk> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<RetrievedChunk> = self
            .chunks
            .iter()
            .map(|chunk| RetrievedChunk {
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                score: cosine_similarity(query_embedding, &chunk.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.text.cmp(&b.text))
        });

        scored.truncate(k);
        scored
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RetrievalError};

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new("test-embedder");
        index.push(IndexedChunk {
            text: "naming rules".to_string(),
            source: "docs/style.md".to_string(),
            embedding: vec![1.0, 0.0],
        });
        index.push(IndexedChunk {
            text: "api response shape".to_string(),
            source: "docs/api.md".to_string(),
            embedding: vec![0.7, 0.7],
        });
        index.push(IndexedChunk {
            text: "deployment notes".to_string(),
            source: "docs/deploy.md".to_string(),
            embedding: vec![0.0, 1.0],
        });
        index
    }

    #[test]
    fn rank_orders_by_descending_similarity() {
        let index = sample_index();
        let hits = index.rank(&[1.0, 0.0], 3);

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "naming rules");
        assert_eq!(hits[1].text, "api response shape");
        assert!(hits[0].score > hits[1].score);
        assert!(hits[1].score > hits[2].score);
    }

    #[test]
    fn rank_truncates_to_k_and_k_zero_is_empty() {
        let index = sample_index();
        assert_eq!(index.rank(&[1.0, 0.0], 1).len(), 1);
        assert!(index.rank(&[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn identical_queries_return_identical_sequences() {
        let index = sample_index();
        let first: Vec<String> = index.rank(&[0.5, 0.5], 3).iter().map(|c| c.text.clone()).collect();
        let second: Vec<String> = index.rank(&[0.5, 0.5], 3).iter().map(|c| c.text.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");

        let index = sample_index();
        index.save(&path).await.unwrap();

        let loaded = VectorIndex::load(&path).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.embedding_model, "test-embedder");
    }

    #[tokio::test]
    async fn missing_index_is_unavailable_not_a_crash() {
        let err = VectorIndex::load("does/not/exist.json").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Retrieval(RetrievalError::IndexUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn garbage_file_is_an_invalid_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        tokio::fs::write(&path, "not json at all").await.unwrap();

        let err = VectorIndex::load(&path).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Retrieval(RetrievalError::InvalidIndex { .. })
        ));
    }
}
