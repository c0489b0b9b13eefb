//! # devmate-search
//!
//! The stdio worker process behind the `search_web` tool. Speaks the
//! line-delimited JSON-RPC worker protocol on stdin/stdout: `initialize`
//! first, then `tools/call` requests for the single `search_web` tool,
//! which queries the Tavily REST API.
//!
//! Diagnostics go to stderr; stdout carries protocol frames only.

use anyhow::{anyhow, Context, Result};
use devmate_core::mcp::protocol::{
    Request, Response, METHOD_CALL_TOOL, METHOD_INITIALIZE, PROTOCOL_VERSION,
};
use serde_json::{json, Value};
use std::future::Future;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const DEFAULT_MAX_RESULTS: u64 = 3;

/// Thin Tavily REST client
struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
}

impl TavilyClient {
    /// Read the API key from the environment the parent process set up
    fn from_env() -> Result<Self> {
        let api_key = std::env::var("TAVILY_API_KEY")
            .context("TAVILY_API_KEY is not set for the search worker")?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
        })
    }

    /// Run one search and format the hits
    async fn search(&self, query: String, max_results: u64) -> Result<String> {
        tracing::info!(query = %query, max_results, "searching");

        let body: Value = self
            .http
            .post(TAVILY_ENDPOINT)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": max_results,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(format_results(&body))
    }
}

/// Format a Tavily response body as Title/URL/Content blocks
fn format_results(body: &Value) -> String {
    let results = body
        .get("results")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default();

    results
        .iter()
        .map(|result| {
            let title = result.get("title").and_then(|v| v.as_str()).unwrap_or("No Title");
            let url = result.get("url").and_then(|v| v.as_str()).unwrap_or("#");
            let content = result.get("content").and_then(|v| v.as_str()).unwrap_or("");
            format!("Title: {}\nURL: {}\nContent: {}\n---", title, url, content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dispatch one request frame. The search backend is injected so the
/// protocol handling is testable without network access.
async fn handle_request<F, Fut>(request: Request, search: &F) -> Response
where
    F: Fn(String, u64) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    match request.method.as_str() {
        METHOD_INITIALIZE => Response::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "devmate-search",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        METHOD_CALL_TOOL => {
            let params = request.params.unwrap_or_else(|| json!({}));
            let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
            if tool_name != "search_web" {
                return Response::failure(
                    request.id,
                    -32602,
                    format!("Unknown tool: {}", tool_name),
                );
            }

            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            let Some(query) = arguments.get("query").and_then(|v| v.as_str()) else {
                return Response::failure(request.id, -32602, "Missing argument: query");
            };
            let max_results = arguments
                .get("max_results")
                .and_then(|v| v.as_u64())
                .unwrap_or(DEFAULT_MAX_RESULTS);

            match search(query.to_string(), max_results).await {
                Ok(content) => Response::success(request.id, json!({ "content": content })),
                Err(e) => Response::failure(
                    request.id,
                    -32000,
                    format!("Error performing search: {}", e),
                ),
            }
        }
        other => Response::failure(request.id, -32601, format!("Unknown method: {}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let tavily = TavilyClient::from_env()?;
    let search = |query: String, max_results: u64| tavily.search(query, max_results);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request, &search).await,
            Err(e) => Response::failure(0, -32700, format!("Parse error: {}", e)),
        };

        let mut frame = serde_json::to_string(&response)
            .map_err(|e| anyhow!("failed to serialize response: {}", e))?;
        frame.push('\n');
        stdout.write_all(frame.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}
