//! Offline ingestion: documents -> chunks -> embeddings -> index file

use crate::config::RetrievalSettings;
use crate::error::{ConfigError, Result};
use crate::llm::EmbeddingClient;
use crate::rag::chunk::split_text;
use crate::rag::index::{IndexedChunk, VectorIndex};
use std::path::Path;
use walkdir::WalkDir;

/// Embedding requests are batched to keep payloads bounded.
const EMBED_BATCH_SIZE: usize = 64;

/// Summary of one ingestion run
#[derive(Debug, Clone)]
pub struct IngestStats {
    /// Markdown documents loaded
    pub documents: usize,
    /// Chunks embedded and written to the index
    pub chunks: usize,
}

/// Scan `settings.docs_dir` for markdown files, chunk and embed them, and
/// overwrite the index at `settings.index_path`.
///
/// Rebuilds from scratch every run; an existing index is replaced, not
/// merged.
pub async fn ingest_docs(
    settings: &RetrievalSettings,
    embedder: &dyn EmbeddingClient,
) -> Result<IngestStats> {
    let docs_dir = &settings.docs_dir;
    if !docs_dir.is_dir() {
        return Err(ConfigError::FileNotFound {
            path: docs_dir.display().to_string(),
        }
        .into());
    }

    let documents = load_markdown_files(docs_dir).await?;
    tracing::info!(count = documents.len(), dir = %docs_dir.display(), "loaded documents");

    let mut texts = Vec::new();
    let mut sources = Vec::new();
    for (source, content) in &documents {
        for chunk in split_text(content, settings.chunk_size, settings.chunk_overlap) {
            texts.push(chunk);
            sources.push(source.clone());
        }
    }
    tracing::info!(chunks = texts.len(), "split documents");

    let mut index = VectorIndex::new(embedder.model_name());
    for batch_start in (0..texts.len()).step_by(EMBED_BATCH_SIZE) {
        let batch_end = (batch_start + EMBED_BATCH_SIZE).min(texts.len());
        let embeddings = embedder.embed(&texts[batch_start..batch_end]).await?;

        for (offset, embedding) in embeddings.into_iter().enumerate() {
            let i = batch_start + offset;
            index.push(IndexedChunk {
                text: texts[i].clone(),
                source: sources[i].clone(),
                embedding,
            });
        }
    }

    index.save(&settings.index_path).await?;
    tracing::info!(path = %settings.index_path.display(), "index written");

    Ok(IngestStats {
        documents: documents.len(),
        chunks: texts.len(),
    })
}

/// Collect `**/*.md` under `dir` as (relative path, content) pairs, sorted
/// by path so ingestion output is stable across runs.
async fn load_markdown_files(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            crate::error::Error::Generic(format!("failed to walk {}: {}", dir.display(), e))
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "md")
        {
            paths.push(entry.path().to_path_buf());
        }
    }
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let content = tokio::fs::read_to_string(&path).await?;
        let source = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        documents.push((source, content));
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CountingEmbedder;

    #[async_trait]
    impl EmbeddingClient for CountingEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect())
        }

        fn model_name(&self) -> &str {
            "counting-embedder"
        }
    }

    fn settings_in(dir: &Path) -> RetrievalSettings {
        RetrievalSettings {
            index_path: dir.join("index.json"),
            docs_dir: dir.join("docs"),
            chunk_size: 50,
            chunk_overlap: 10,
            top_k: 2,
        }
    }

    #[tokio::test]
    async fn ingest_builds_a_loadable_index() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs").join("nested");
        tokio::fs::create_dir_all(&docs).await.unwrap();
        tokio::fs::write(docs.join("rules.md"), "always prefix globals with dm_secret_")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("docs").join("api.md"), "responses carry a code field")
            .await
            .unwrap();
        // Non-markdown files are ignored.
        tokio::fs::write(dir.path().join("docs").join("notes.txt"), "ignored")
            .await
            .unwrap();

        let settings = settings_in(dir.path());
        let stats = ingest_docs(&settings, &CountingEmbedder).await.unwrap();

        assert_eq!(stats.documents, 2);
        assert!(stats.chunks >= 2);

        let index = VectorIndex::load(&settings.index_path).await.unwrap();
        assert_eq!(index.len(), stats.chunks);
        assert_eq!(index.embedding_model, "counting-embedder");
        assert!(index.chunks.iter().any(|c| c.source == "nested/rules.md"));
    }

    #[tokio::test]
    async fn missing_docs_dir_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());

        let err = ingest_docs(&settings, &CountingEmbedder).await.unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[tokio::test]
    async fn reingesting_replaces_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        tokio::fs::create_dir_all(&docs).await.unwrap();
        tokio::fs::write(docs.join("one.md"), "first version").await.unwrap();

        let settings = settings_in(dir.path());
        ingest_docs(&settings, &CountingEmbedder).await.unwrap();

        tokio::fs::write(docs.join("one.md"), "second version, rewritten")
            .await
            .unwrap();
        ingest_docs(&settings, &CountingEmbedder).await.unwrap();

        let index = VectorIndex::load(&settings.index_path).await.unwrap();
        assert!(index.chunks.iter().all(|c| c.text.contains("second")));
    }
}
