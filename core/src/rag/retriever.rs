//! Query-time retrieval against the persisted index

use crate::config::RetrievalSettings;
use crate::error::{Result, RetrievalError};
use crate::llm::EmbeddingClient;
use crate::rag::index::{RetrievedChunk, VectorIndex};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

/// Upper bound on one query-embedding round trip.
const EMBED_TIMEOUT_SECS: u64 = 60;

/// Knowledge retriever.
///
/// Embeds the query, opens the persisted index read-only and returns the
/// top-k chunks by cosine similarity. The index is reloaded per query,
/// which keeps the retriever stateless and makes concurrent retrievals
/// trivially safe.
pub struct Retriever {
    index_path: PathBuf,
    embedder: Arc<dyn EmbeddingClient>,
}

impl Retriever {
    /// Create a retriever from resolved settings and an embedding client
    pub fn new(settings: &RetrievalSettings, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            index_path: settings.index_path.clone(),
            embedder,
        }
    }

    /// Return up to `k` chunks relevant to `query`, best first.
    ///
    /// `k == 0` short-circuits to an empty result. An index that was never
    /// built fails with `RetrievalError::IndexUnavailable`; zero hits are
    /// an empty sequence, not an error.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let index = VectorIndex::load(&self.index_path).await?;
        if index.is_empty() {
            return Ok(Vec::new());
        }

        if index.embedding_model != self.embedder.model_name() {
            tracing::warn!(
                index_model = %index.embedding_model,
                query_model = %self.embedder.model_name(),
                "index was built with a different embedding model; scores may be meaningless"
            );
        }

        let mut vectors = timeout(
            Duration::from_secs(EMBED_TIMEOUT_SECS),
            self.embedder.embed(&[query.to_string()]),
        )
        .await
        .map_err(|_| RetrievalError::EmbeddingFailed {
            message: format!("query embedding timed out after {}s", EMBED_TIMEOUT_SECS),
        })??;
        let query_embedding = vectors.pop().unwrap_or_default();

        tracing::debug!(query, k, chunks = index.len(), "retrieval query");
        Ok(index.rank(&query_embedding, k))
    }
}
