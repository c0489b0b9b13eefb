//! Base tool traits and structures

use crate::error::{Result, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of the tool
    fn name(&self) -> &str;

    /// Get the description of the tool
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool's parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters
    async fn execute(&self, call: ToolCall) -> Result<ToolResult>;

    /// Get examples of how to use this tool
    fn examples(&self) -> Vec<ToolExample> {
        Vec::new()
    }
}

/// A call to a tool, as requested by the model.
///
/// Immutable once created; consumed exactly once by the dispatcher. A
/// repeated id is treated as a brand-new invocation, side effects included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Parameters to pass to the tool
    pub parameters: serde_json::Value,
}

/// Result of a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this is a result for
    pub tool_call_id: String,

    /// Whether the execution was successful
    pub success: bool,

    /// Result content
    pub content: String,

    /// Execution duration in milliseconds
    pub duration_ms: Option<u64>,
}

/// Example usage of a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExample {
    /// Description of what this example does
    pub description: String,

    /// Example parameters
    pub parameters: serde_json::Value,

    /// Expected result description
    pub expected_result: String,
}

impl ToolCall {
    /// Create a new tool call with a generated id
    pub fn new<S: Into<String>>(name: S, parameters: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            parameters,
        }
    }

    /// Get a parameter value by key
    pub fn get_parameter<T>(&self, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self
            .parameters
            .get(key)
            .ok_or_else(|| ToolError::InvalidParameters {
                message: format!("Missing parameter: {}", key),
            })?;

        serde_json::from_value(value.clone()).map_err(|_| {
            ToolError::InvalidParameters {
                message: format!("Invalid parameter type for: {}", key),
            }
            .into()
        })
    }

    /// Get a parameter value by key with a default
    pub fn get_parameter_or<T>(&self, key: &str, default: T) -> T
    where
        T: for<'de> Deserialize<'de> + Clone,
    {
        self.get_parameter(key).unwrap_or(default)
    }
}

impl ToolResult {
    /// Create a successful result
    pub fn success<S: Into<String>>(tool_call_id: S, content: S) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: true,
            content: content.into(),
            duration_ms: None,
        }
    }

    /// Create an error result
    pub fn error<S: Into<String>>(tool_call_id: S, error: S) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            success: false,
            content: format!("Error: {}", error.into()),
            duration_ms: None,
        }
    }

    /// Set execution duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Tool executor: dispatches a call to the named tool.
///
/// Frozen after construction; every failure mode, including an unknown
/// tool name, comes back as an error-marked ToolResult rather than an Err
/// so the model can see the failure and recover.
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create a new tool executor
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub(crate) fn register_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Execute a tool call
    pub async fn execute(&self, call: ToolCall) -> ToolResult {
        let Some(tool) = self.get_tool(&call.name) else {
            tracing::warn!(tool = %call.name, "unknown tool requested");
            let message = format!(
                "Tool '{}' is not available. Available tools: {}",
                call.name,
                self.list_tools().join(", ")
            );
            return ToolResult::error(call.id.as_str(), message.as_str());
        };

        let start_time = std::time::Instant::now();
        let call_id = call.id.clone();
        let result = tool.execute(call).await;
        let duration = start_time.elapsed().as_millis() as u64;

        match result {
            Ok(mut result) => {
                result.duration_ms = Some(duration);
                result
            }
            Err(e) => {
                ToolResult::error(call_id.as_str(), e.to_string().as_str()).with_duration(duration)
            }
        }
    }

    /// Get tool definitions for LLM function calling
    pub fn get_tool_definitions(&self) -> Vec<crate::llm::ToolDefinition> {
        let mut definitions: Vec<_> = self
            .tools
            .values()
            .map(|tool| crate::llm::ToolDefinition {
                tool_type: "function".to_string(),
                function: crate::llm::FunctionDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters_schema(),
                },
            })
            .collect();
        definitions.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        definitions
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
            let text: String = call.get_parameter("text")?;
            Ok(ToolResult::success(call.id.as_str(), text.as_str()))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
            let _ = call;
            Err(ToolError::ExecutionFailed {
                name: "broken".to_string(),
                message: "boom".to_string(),
            }
            .into())
        }
    }

    fn executor() -> ToolExecutor {
        let mut executor = ToolExecutor::new();
        executor.register_tool(Box::new(EchoTool));
        executor.register_tool(Box::new(FailingTool));
        executor
    }

    #[tokio::test]
    async fn unknown_tool_degrades_to_error_result() {
        let executor = executor();
        let result = executor
            .execute(ToolCall::new("missing", json!({})))
            .await;

        assert!(!result.success);
        assert!(result.content.contains("not available"));
        assert!(result.content.contains("echo"));
    }

    #[tokio::test]
    async fn handler_failure_is_caught_and_stringified() {
        let executor = executor();
        let result = executor.execute(ToolCall::new("broken", json!({}))).await;

        assert!(!result.success);
        assert!(result.content.starts_with("Error:"));
        assert!(result.content.contains("boom"));
        assert!(result.duration_ms.is_some());
    }

    #[tokio::test]
    async fn successful_call_carries_duration() {
        let executor = executor();
        let result = executor
            .execute(ToolCall::new("echo", json!({"text": "hi"})))
            .await;

        assert!(result.success);
        assert_eq!(result.content, "hi");
        assert!(result.duration_ms.is_some());
    }

    #[tokio::test]
    async fn missing_parameter_is_an_invalid_parameters_failure() {
        let executor = executor();
        let result = executor.execute(ToolCall::new("echo", json!({}))).await;

        assert!(!result.success);
        assert!(result.content.contains("Missing parameter"));
    }
}
