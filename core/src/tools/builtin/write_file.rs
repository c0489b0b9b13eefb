//! Sandboxed file writing tool

use crate::error::{Result, ToolError};
use crate::tools::{Tool, ToolCall, ToolExample, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Tool that writes text files under a single sandbox directory.
///
/// Every path is forced under the sandbox root; parent directories are
/// created as needed; an existing file is overwritten, so the last write
/// wins.
pub struct WriteFileTool {
    sandbox_root: PathBuf,
}

impl WriteFileTool {
    pub fn new<P: Into<PathBuf>>(sandbox_root: P) -> Self {
        Self {
            sandbox_root: sandbox_root.into(),
        }
    }

    /// Resolve a model-supplied path to a location inside the sandbox.
    ///
    /// Absolute paths and parent-directory traversal are rejected before
    /// anything touches the filesystem. A path already prefixed with the
    /// sandbox root is accepted as-is rather than nested twice.
    fn resolve(&self, file_path: &str) -> Result<PathBuf> {
        let requested = Path::new(file_path);
        if requested.is_absolute() {
            return Err(ToolError::InvalidParameters {
                message: format!("file_path must be relative, got: {}", file_path),
            }
            .into());
        }

        let relative = requested
            .strip_prefix(&self.sandbox_root)
            .unwrap_or(requested);

        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ToolError::InvalidParameters {
                message: format!("file_path may not leave the sandbox: {}", file_path),
            }
            .into());
        }

        Ok(self.sandbox_root.join(relative))
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file under the output directory.\n\
         Parent directories are created automatically and existing files \
         are overwritten. Put every generated project in its own \
         descriptive subdirectory so projects do not mix."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file, relative to the output directory"
                },
                "content": {
                    "type": "string",
                    "description": "Text content to write"
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(&self, call: ToolCall) -> Result<ToolResult> {
        let file_path: String = call.get_parameter("file_path")?;
        let content: String = call.get_parameter("content")?;

        let target = self.resolve(&file_path)?;

        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    ToolError::ExecutionFailed {
                        name: "write_file".to_string(),
                        message: format!("failed to create {}: {}", parent.display(), e),
                    }
                })?;
            }
        }

        fs::write(&target, &content)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                name: "write_file".to_string(),
                message: format!("failed to write {}: {}", target.display(), e),
            })?;

        tracing::info!(path = %target.display(), bytes = content.len(), "file written");
        let message = format!("Successfully wrote to {}", target.display());
        Ok(ToolResult::success(call.id.as_str(), message.as_str()))
    }

    fn examples(&self) -> Vec<ToolExample> {
        vec![ToolExample {
            description: "Write the entry point of a generated project".to_string(),
            parameters: json!({
                "file_path": "hiking_app/main.py",
                "content": "print('hello')"
            }),
            expected_result: "Successfully wrote to output/hiking_app/main.py".to_string(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(file_path: &str, content: &str) -> ToolCall {
        ToolCall::new(
            "write_file",
            json!({"file_path": file_path, "content": content}),
        )
    }

    #[tokio::test]
    async fn writes_and_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path());

        let result = tool
            .execute(call("hiking_app/static/index.html", "<html></html>"))
            .await
            .unwrap();

        assert!(result.success);
        let written = tokio::fs::read_to_string(dir.path().join("hiking_app/static/index.html"))
            .await
            .unwrap();
        assert_eq!(written, "<html></html>");
    }

    #[tokio::test]
    async fn second_write_to_same_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path());

        tool.execute(call("main.py", "first")).await.unwrap();
        tool.execute(call("main.py", "second")).await.unwrap();

        let written = tokio::fs::read_to_string(dir.path().join("main.py"))
            .await
            .unwrap();
        assert_eq!(written, "second");
    }

    #[tokio::test]
    async fn traversal_outside_the_sandbox_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = WriteFileTool::new(dir.path());

        let err = tool
            .execute(call("../escape.txt", "nope"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sandbox"));

        let err = tool.execute(call("/etc/passwd", "nope")).await.unwrap_err();
        assert!(err.to_string().contains("relative"));
    }

    #[tokio::test]
    async fn sandbox_prefix_is_not_doubled() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("output");
        let tool = WriteFileTool::new(&root);

        // The model often prefixes paths with the sandbox directory itself.
        let requested = root.join("app/main.py");
        tool.execute(call(requested.to_str().unwrap(), "content"))
            .await
            .unwrap_err();

        // Relative form of the same habit resolves cleanly.
        let tool = WriteFileTool::new("output");
        let resolved = tool.resolve("output/app/main.py").unwrap();
        assert_eq!(resolved, PathBuf::from("output/app/main.py"));
    }
}
