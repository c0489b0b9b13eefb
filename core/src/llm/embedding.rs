//! Embedding client boundary used by ingestion and retrieval

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;

use crate::config::LlmSettings;
use crate::error::{Result, RetrievalError};

/// Trait for embedding clients.
///
/// The retriever and the ingestion pipeline depend on this seam so tests
/// can substitute a deterministic embedder.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Name of the embedding model
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible embedding client
pub struct OpenAiEmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Create a new embedding client from resolved LLM settings
    pub fn new(settings: &LlmSettings) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.base_url);

        Self {
            client: Client::with_config(openai_config),
            model: settings.embedding_model.clone(),
        }
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()
            .map_err(|e| RetrievalError::EmbeddingFailed {
                message: format!("Failed to build embedding request: {}", e),
            })?;

        let response = self.client.embeddings().create(request).await.map_err(|e| {
            RetrievalError::EmbeddingFailed {
                message: e.to_string(),
            }
        })?;

        // The API may return vectors out of order; reassemble by index.
        let mut vectors: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];
        for data in response.data {
            let index = data.index as usize;
            if index >= vectors.len() {
                return Err(RetrievalError::EmbeddingFailed {
                    message: format!("Embedding index {} out of range", index),
                }
                .into());
            }
            vectors[index] = data.embedding;
        }

        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
