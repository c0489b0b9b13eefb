//! Offline ingestion command: build the knowledge index from docs/

use anyhow::Result;
use devmate_core::llm::OpenAiEmbeddingClient;
use devmate_core::rag::ingest_docs;
use devmate_core::Config;
use tracing::info;

/// Build (or rebuild) the persisted knowledge index
pub async fn ingest_command(config: Config) -> Result<()> {
    info!(
        docs_dir = %config.retrieval.docs_dir.display(),
        index = %config.retrieval.index_path.display(),
        "building knowledge index"
    );

    let embedder = OpenAiEmbeddingClient::new(&config.llm);
    let stats = ingest_docs(&config.retrieval, &embedder).await?;

    println!(
        "Indexed {} chunks from {} documents into {}",
        stats.chunks,
        stats.documents,
        config.retrieval.index_path.display()
    );

    Ok(())
}
