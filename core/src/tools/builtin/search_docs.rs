//! Local knowledge base search tool

use crate::error::Result;
use crate::rag::Retriever;
use crate::tools::{Tool, ToolCall, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

/// Sentinel returned when the index holds nothing relevant. A miss is an
/// answer for the model, not a failed turn.
pub const NOTHING_FOUND: &str = "No relevant content found in the local documents.";

/// Tool that consults the locally indexed documentation
pub struct SearchLocalDocsTool {
    retriever: Arc<Retriever>,
    top_k: usize,
}

impl SearchLocalDocsTool {
    pub fn new(retriever: Arc<Retriever>, top_k: usize) -> Self {
        Self { retriever, top_k }
    }
}

#[async_trait]
impl Tool for SearchLocalDocsTool {
    fn name(&self) -> &str {
        "search_local_docs"
    }

    fn description(&self) -> &str {
        "Consult the local knowledge base / internal documentation.\n\
         Use this tool first whenever the question concerns internal \
         conventions, project-specific rules or custom library usage. \
         Generated code must strictly follow whatever rules this tool \
         returns."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look up in the local documents"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let query: String = call.get_parameter("query")?;

        let chunks = self.retriever.retrieve(&query, self.top_k).await?;
        if chunks.is_empty() {
            return Ok(ToolResult::success(call.id.as_str(), NOTHING_FOUND));
        }

        let formatted = chunks
            .iter()
            .map(|chunk| format!("[doc snippet] ({}):\n{}", chunk.source, chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(ToolResult::success(call.id.as_str(), formatted.as_str()))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Look up the project's naming conventions".to_string(),
            parameters: json!({"query": "variable naming rule"}),
            expected_result: "Doc snippets describing the naming rule".to_string(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalSettings;
    use crate::llm::EmbeddingClient;
    use crate::rag::{IndexedChunk, VectorIndex};

    struct FlatEmbedder;

    #[async_trait]
    impl EmbeddingClient for FlatEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn model_name(&self) -> &str {
            "flat-embedder"
        }
    }

    async fn tool_with_index(chunks: Vec<IndexedChunk>, dir: &std::path::Path) -> SearchLocalDocsTool {
        let path = dir.join("index.json");
        let mut index = VectorIndex::new("flat-embedder");
        for chunk in chunks {
            index.push(chunk);
        }
        index.save(&path).await.unwrap();

        let settings = RetrievalSettings {
            index_path: path,
            ..Default::default()
        };
        let retriever = Arc::new(Retriever::new(&settings, Arc::new(FlatEmbedder)));
        SearchLocalDocsTool::new(retriever, 2)
    }

    #[tokio::test]
    async fn hits_are_formatted_as_doc_snippets() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_with_index(
            vec![IndexedChunk {
                text: "globals must use the dm_secret_ prefix".to_string(),
                source: "conventions.md".to_string(),
                embedding: vec![1.0, 0.0],
            }],
            dir.path(),
        )
        .await;

        let result = tool
            .execute(ToolCall::new("search_local_docs", json!({"query": "naming"})))
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.content.contains("[doc snippet]"));
        assert!(result.content.contains("dm_secret_"));
    }

    #[tokio::test]
    async fn empty_index_yields_the_sentinel_text() {
        let dir = tempfile::tempdir().unwrap();
        let tool = tool_with_index(Vec::new(), dir.path()).await;

        let result = tool
            .execute(ToolCall::new("search_local_docs", json!({"query": "anything"})))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.content, NOTHING_FOUND);
    }

    #[tokio::test]
    async fn missing_index_propagates_to_the_dispatcher() {
        let settings = RetrievalSettings {
            index_path: "never/built/index.json".into(),
            ..Default::default()
        };
        let retriever = Arc::new(Retriever::new(&settings, Arc::new(FlatEmbedder)));
        let tool = SearchLocalDocsTool::new(retriever, 2);

        let err = tool
            .execute(ToolCall::new("search_local_docs", json!({"query": "anything"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }
}
