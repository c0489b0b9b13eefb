//! Line-delimited JSON-RPC framing for the worker protocol
//!
//! The client and the bundled `devmate-search` worker speak JSON-RPC 2.0,
//! one message per line, over the worker's stdin/stdout. Two request kinds
//! exist: `initialize` (capability handshake, required before anything
//! else) and `tools/call`. A successful call result carries a `content`
//! text field; failures carry a JSON-RPC `error` object.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Protocol revision sent during the handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Method name of the handshake request
pub const METHOD_INITIALIZE: &str = "initialize";

/// Method name of a tool invocation request
pub const METHOD_CALL_TOOL: &str = "tools/call";

/// A JSON-RPC request frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Build the initialize handshake request
    pub fn initialize(id: u64, client_name: &str, client_version: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: METHOD_INITIALIZE.to_string(),
            params: Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "clientInfo": {
                    "name": client_name,
                    "version": client_version,
                },
            })),
        }
    }

    /// Build a tool call request
    pub fn call_tool(id: u64, tool_name: &str, arguments: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: METHOD_CALL_TOOL.to_string(),
            params: Some(json!({
                "name": tool_name,
                "arguments": arguments,
            })),
        }
    }
}

/// A JSON-RPC response frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// A JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl Response {
    /// Build a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response
    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Extract the `content` text from a tool call result, if present
    pub fn content_text(&self) -> Option<String> {
        self.result
            .as_ref()?
            .get("content")
            .and_then(|c| c.as_str())
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_request_carries_protocol_version() {
        let request = Request::initialize(1, "devmate", "0.1.0");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "initialize");
        assert_eq!(value["params"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(value["params"]["clientInfo"]["name"], "devmate");
    }

    #[test]
    fn call_tool_request_wraps_name_and_arguments() {
        let request = Request::call_tool(7, "search_web", json!({"query": "rust"}));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "tools/call");
        assert_eq!(value["params"]["name"], "search_web");
        assert_eq!(value["params"]["arguments"]["query"], "rust");
    }

    #[test]
    fn content_text_reads_success_payload() {
        let response = Response::success(2, json!({"content": "three results"}));
        assert_eq!(response.content_text().unwrap(), "three results");
    }

    #[test]
    fn content_text_is_none_for_errors() {
        let response = Response::failure(2, -32000, "worker exploded");
        assert!(response.content_text().is_none());
        assert_eq!(response.error.as_ref().unwrap().message, "worker exploded");
    }

    #[test]
    fn response_roundtrips_one_line() {
        let response = Response::success(3, json!({"content": "ok"}));
        let line = serde_json::to_string(&response).unwrap();
        assert!(!line.contains('\n'));

        let parsed: Response = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.id, 3);
        assert_eq!(parsed.content_text().unwrap(), "ok");
    }
}
