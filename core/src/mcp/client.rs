//! Client side of the worker protocol.
//!
//! Each call spawns a fresh worker process, performs the initialize
//! handshake, issues exactly one `tools/call` and tears the process down.
//! The child is spawned with `kill_on_drop`, so the process and its pipes
//! are released on every exit path: success, worker error, timeout,
//! malformed response, or the caller dropping the future.

use crate::config::WorkerSettings;
use crate::error::{Result, ToolError};
use crate::mcp::protocol::{Request, Response};
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::{timeout, Duration};

/// Spawns worker processes and runs single tool calls against them
pub struct WorkerClient {
    settings: WorkerSettings,
}

/// One live worker process with its duplex stream.
///
/// Owned exclusively by one `call_once` invocation; never reused.
struct WorkerSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl WorkerClient {
    /// Create a client from resolved worker settings
    pub fn new(settings: WorkerSettings) -> Self {
        Self { settings }
    }

    /// Spawn a worker, handshake, run one tool call, tear down.
    ///
    /// Returns the worker's `content` text. All failure modes map to the
    /// tool error taxonomy; the dispatcher turns them into ToolResult text.
    pub async fn call_once(&self, tool_name: &str, arguments: Value) -> Result<String> {
        let mut session = self.spawn()?;

        let outcome = self.handshake_and_call(&mut session, tool_name, arguments).await;

        session.shutdown().await;
        outcome
    }

    fn spawn(&self) -> Result<WorkerSession> {
        let program = &self.settings.command[0];
        let mut cmd = Command::new(program);
        cmd.args(&self.settings.command[1..]);
        cmd.envs(&self.settings.env);
        if let Some(dir) = &self.settings.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ToolError::ProcessStart {
            message: format!("{}: {}", program, e),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| ToolError::ProcessStart {
            message: "worker stdin not captured".to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ToolError::ProcessStart {
            message: "worker stdout not captured".to_string(),
        })?;

        Ok(WorkerSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
        })
    }

    async fn handshake_and_call(
        &self,
        session: &mut WorkerSession,
        tool_name: &str,
        arguments: Value,
    ) -> Result<String> {
        let handshake_secs = self.settings.handshake_timeout_secs;
        let init = Request::initialize(session.next_id(), "devmate", crate::VERSION);
        let init_response = timeout(
            Duration::from_secs(handshake_secs),
            session.roundtrip(&init),
        )
        .await
        .map_err(|_| ToolError::HandshakeTimeout {
            seconds: handshake_secs,
        })??;

        if let Some(error) = init_response.error {
            return Err(ToolError::ExecutionFailed {
                name: tool_name.to_string(),
                message: format!("handshake rejected: {}", error.message),
            }
            .into());
        }
        tracing::debug!(tool = tool_name, "worker handshake complete");

        let call_secs = self.settings.call_timeout_secs;
        let call = Request::call_tool(session.next_id(), tool_name, arguments);
        let response = timeout(Duration::from_secs(call_secs), session.roundtrip(&call))
            .await
            .map_err(|_| ToolError::Timeout {
                name: tool_name.to_string(),
            })??;

        if let Some(error) = response.error {
            return Err(ToolError::ExecutionFailed {
                name: tool_name.to_string(),
                message: error.message,
            }
            .into());
        }

        response.content_text().ok_or_else(|| {
            ToolError::ExecutionFailed {
                name: tool_name.to_string(),
                message: "worker response missing content".to_string(),
            }
            .into()
        })
    }
}

impl WorkerSession {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Send one request line and read one response line.
    ///
    /// Pipe-level IO failures mean the worker died under us; they are
    /// reported as execution failures, not raw IO errors.
    async fn roundtrip(&mut self, request: &Request) -> Result<Response> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Self::stream_error(&request.method, e))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| Self::stream_error(&request.method, e))?;

        let mut response_line = String::new();
        let read = self
            .reader
            .read_line(&mut response_line)
            .await
            .map_err(|e| Self::stream_error(&request.method, e))?;
        if read == 0 {
            return Err(ToolError::ExecutionFailed {
                name: request.method.clone(),
                message: "worker closed its output stream".to_string(),
            }
            .into());
        }

        let response: Response =
            serde_json::from_str(response_line.trim()).map_err(|e| ToolError::ExecutionFailed {
                name: request.method.clone(),
                message: format!("malformed worker response: {}", e),
            })?;

        Ok(response)
    }

    fn stream_error(method: &str, e: std::io::Error) -> crate::error::Error {
        ToolError::ExecutionFailed {
            name: method.to_string(),
            message: format!("worker stream failed: {}", e),
        }
        .into()
    }

    /// Terminate the worker. kill_on_drop is the backstop; this makes the
    /// release explicit on the ordinary path.
    async fn shutdown(mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ToolError};
    use serde_json::json;

    fn settings_for(command: Vec<&str>) -> WorkerSettings {
        WorkerSettings {
            command: command.into_iter().map(String::from).collect(),
            env: Default::default(),
            working_dir: None,
            handshake_timeout_secs: 1,
            call_timeout_secs: 2,
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_process_start_error() {
        let client = WorkerClient::new(settings_for(vec!["devmate-no-such-worker-binary"]));
        let err = client
            .call_once("search_web", json!({"query": "x"}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Tool(ToolError::ProcessStart { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn silent_worker_times_out_during_handshake() {
        // A worker that never answers the initialize request.
        let client = WorkerClient::new(settings_for(vec!["sleep", "30"]));
        let err = client
            .call_once("search_web", json!({"query": "x"}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Tool(ToolError::HandshakeTimeout { seconds: 1 })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn scripted_worker_round_trip_succeeds() {
        let script = r#"read -r _init
printf '{"jsonrpc":"2.0","id":1,"result":{"capabilities":{"tools":{}}}}\n'
read -r _call
printf '{"jsonrpc":"2.0","id":2,"result":{"content":"two results"}}\n'
"#;
        let client = WorkerClient::new(settings_for(vec!["sh", "-c", script]));
        let content = client
            .call_once("search_web", json!({"query": "rust"}))
            .await
            .unwrap();

        assert_eq!(content, "two results");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn worker_error_object_becomes_execution_failure() {
        let script = r#"read -r _init
printf '{"jsonrpc":"2.0","id":1,"result":{}}\n'
read -r _call
printf '{"jsonrpc":"2.0","id":2,"error":{"code":-32000,"message":"quota exhausted"}}\n'
"#;
        let client = WorkerClient::new(settings_for(vec!["sh", "-c", script]));
        let err = client
            .call_once("search_web", json!({"query": "rust"}))
            .await
            .unwrap_err();

        match err {
            Error::Tool(ToolError::ExecutionFailed { message, .. }) => {
                assert!(message.contains("quota exhausted"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn worker_closing_stream_is_an_execution_failure() {
        let client = WorkerClient::new(settings_for(vec!["true"]));
        let err = client
            .call_once("search_web", json!({"query": "rust"}))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Tool(ToolError::ExecutionFailed { .. })
        ));
    }
}
