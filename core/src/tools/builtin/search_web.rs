//! Web search tool backed by the external worker process

use crate::config::WorkerSettings;
use crate::error::Result;
use crate::mcp::WorkerClient;
use crate::tools::{Tool, ToolCall, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;

/// Default number of search results requested from the worker
const DEFAULT_MAX_RESULTS: u32 = 3;

/// Tool that searches the web through the spawned worker.
///
/// One fresh worker per call: spawn, handshake, one `tools/call`, tear
/// down. Every failure (spawn, timeout, worker error) comes back as a
/// ToolResult whose text describes the failure so the model can retry or
/// give up.
pub struct SearchWebTool {
    client: WorkerClient,
}

impl SearchWebTool {
    pub fn new(settings: WorkerSettings) -> Self {
        Self {
            client: WorkerClient::new(settings),
        }
    }
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the internet for up-to-date information.\n\
         Use this when the local documents cannot answer, or when the \
         question needs current general knowledge such as library usage or \
         recent language features. Stop at the first usable example."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search keywords"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Number of results to return (default: 3)",
                    "minimum": 1
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let query: String = call.get_parameter("query")?;
        let max_results: u32 = call.get_parameter_or("max_results", DEFAULT_MAX_RESULTS);

        let arguments = json!({
            "query": query,
            "max_results": max_results,
        });

        match self.client.call_once("search_web", arguments).await {
            Ok(content) => Ok(ToolResult::success(call.id.as_str(), content.as_str())),
            Err(e) => {
                tracing::warn!(error = %e, "web search failed");
                let message = format!("Web search failed: {}", e);
                Ok(ToolResult::error(call.id.as_str(), message.as_str()))
            }
        }
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Look up current library usage".to_string(),
            parameters: json!({"query": "fastapi static files example", "max_results": 3}),
            expected_result: "Title/URL/Content blocks for the top hits".to_string(),
        }]
    }
}
