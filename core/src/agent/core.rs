//! The conversation orchestrator: one state machine per user turn

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::config::AgentConfig;
use crate::agent::prompt::build_system_prompt;
use crate::error::{AgentError, Result};
use crate::llm::{ChatOptions, ContentBlock, ConversationHistory, LlmClient, LlmMessage};
use crate::tools::{ToolCall, ToolExecutor, ToolResult};
use crate::trajectory::{TrajectoryEntry, TrajectoryRecorder};

/// After this many consecutive failures of the same tool within a turn,
/// the appended result tells the model to stop retrying it.
const MAX_CONSECUTIVE_TOOL_FAILURES: u32 = 2;

/// State of the turn loop. Every turn starts in `AwaitingModel` and ends
/// in `Done`; `ExecutingTools` is entered once per assistant message that
/// requests tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    AwaitingModel,
    ExecutingTools,
    Done,
}

/// The agent: owns the model client and the frozen tool set, and drives
/// the inference/tool loop over a caller-owned conversation history.
pub struct Agent {
    config: AgentConfig,
    llm_client: Arc<dyn LlmClient>,
    tool_executor: ToolExecutor,
    chat_options: ChatOptions,
    trajectory: Option<TrajectoryRecorder>,
}

impl Agent {
    /// Create an agent from already-assembled parts. Most callers go
    /// through [`crate::agent::AgentBuilder`] instead.
    pub fn new(
        config: AgentConfig,
        llm_client: Arc<dyn LlmClient>,
        tool_executor: ToolExecutor,
        chat_options: ChatOptions,
        trajectory: Option<TrajectoryRecorder>,
    ) -> Self {
        Self {
            config,
            llm_client,
            tool_executor,
            chat_options,
            trajectory,
        }
    }

    /// Agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Names of the tools available to the model
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_executor.list_tools()
    }

    /// Run one user turn to completion and return the final assistant text.
    ///
    /// The history is the caller's: this method appends the user message,
    /// then alternates between model inference and tool execution until
    /// the model answers without tool calls. Every tool call receives
    /// exactly one result, appended contiguously in request order, before
    /// the next inference.
    ///
    /// History is only mutated between awaits, in fully-formed blocks, so
    /// dropping the returned future (user abort) never leaves a partial
    /// tool exchange behind. A model-inference failure rolls the history
    /// back to the state it had when the turn began.
    pub async fn run_turn(
        &self,
        history: &mut ConversationHistory,
        user_input: &str,
    ) -> Result<String> {
        let turn_start = history.len();
        history.push(LlmMessage::user(user_input));

        if let Some(recorder) = &self.trajectory {
            recorder
                .record(TrajectoryEntry::turn_start(user_input.to_string()))
                .await?;
        }

        let tool_definitions = self.tool_executor.get_tool_definitions();
        let mut consecutive_failures: HashMap<String, u32> = HashMap::new();
        let mut state = TurnState::AwaitingModel;
        let mut iteration = 0usize;

        loop {
            debug_assert_eq!(state, TurnState::AwaitingModel);

            if iteration == self.config.max_turn_iterations {
                tracing::warn!(
                    max_iterations = self.config.max_turn_iterations,
                    "turn iteration limit reached"
                );
                return Err(AgentError::TurnLimitExceeded {
                    max_iterations: self.config.max_turn_iterations,
                }
                .into());
            }
            iteration += 1;

            let messages = self.assemble_messages(history);
            if let Some(recorder) = &self.trajectory {
                recorder
                    .record(TrajectoryEntry::llm_request(
                        messages.len(),
                        self.llm_client.model_name().to_string(),
                        iteration,
                    ))
                    .await?;
            }

            let response = match self
                .llm_client
                .chat_completion(
                    messages,
                    Some(tool_definitions.clone()),
                    Some(self.chat_options.clone()),
                )
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    // Inference failures are not recoverable by the model;
                    // hand the turn back untouched.
                    tracing::error!(iteration, error = %e, "model inference failed");
                    history.truncate(turn_start);
                    return Err(e);
                }
            };

            if let Some(recorder) = &self.trajectory {
                recorder
                    .record(TrajectoryEntry::llm_response(
                        response.message.clone(),
                        response.usage.clone(),
                        iteration,
                    ))
                    .await?;
            }

            let assistant = response.message;
            let tool_calls = extract_tool_calls(&assistant);

            if tool_calls.is_empty() {
                let text = assistant.get_text().unwrap_or_default();
                history.push(assistant);
                state = TurnState::Done;
                tracing::debug!(iteration, ?state, "turn finished");

                if let Some(recorder) = &self.trajectory {
                    recorder
                        .record(TrajectoryEntry::turn_complete(text.clone(), iteration))
                        .await?;
                }
                return Ok(text);
            }

            state = TurnState::ExecutingTools;
            tracing::debug!(iteration, ?state, calls = tool_calls.len(), "executing tools");

            // Independent calls run concurrently; join_all yields results
            // in request order, so appends stay deterministic regardless
            // of completion order.
            let executions = tool_calls
                .iter()
                .map(|call| self.tool_executor.execute(call.clone()));
            let mut results: Vec<ToolResult> = futures::future::join_all(executions).await;

            for (call, result) in tool_calls.iter().zip(results.iter_mut()) {
                self.note_consecutive_failures(&mut consecutive_failures, call, result);
            }

            // The assistant message and all of its results land together,
            // contiguously and in request order.
            history.push(assistant);
            for (call, result) in tool_calls.iter().zip(results.iter()) {
                if let Some(recorder) = &self.trajectory {
                    recorder
                        .record(TrajectoryEntry::tool_exchange(
                            call.clone(),
                            result.clone(),
                            iteration,
                        ))
                        .await?;
                }
                history.push(LlmMessage::tool_result(
                    call.id.clone(),
                    result.content.clone(),
                    !result.success,
                ));
            }

            state = TurnState::AwaitingModel;
        }
    }

    /// Full context for one inference: the configured system prompt is
    /// prepended when the caller's history does not carry its own.
    fn assemble_messages(&self, history: &ConversationHistory) -> Vec<LlmMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !history.has_system_prompt() {
            messages.push(LlmMessage::system(build_system_prompt(
                self.config.system_prompt.as_deref(),
                &self.tool_executor.list_tools(),
            )));
        }
        messages.extend_from_slice(history.messages());
        messages
    }

    /// Track consecutive failures per tool; on the second strike the
    /// result text tells the model to give up on that tool.
    fn note_consecutive_failures(
        &self,
        counters: &mut HashMap<String, u32>,
        call: &ToolCall,
        result: &mut ToolResult,
    ) {
        if result.success {
            counters.remove(&call.name);
            return;
        }

        let count = counters.entry(call.name.clone()).or_insert(0);
        *count += 1;
        tracing::warn!(tool = %call.name, failures = *count, "tool call failed");

        if *count >= MAX_CONSECUTIVE_TOOL_FAILURES {
            result.content.push_str(&format!(
                "\n\nThe tool '{}' has now failed {} times in a row. \
                 Do not call it again this turn; report the failure to the user instead.",
                call.name, count
            ));
        }
    }
}

/// Pull the tool call requests out of an assistant message, in the order
/// the model emitted them.
fn extract_tool_calls(message: &LlmMessage) -> Vec<ToolCall> {
    message
        .get_tool_uses()
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                id: id.clone(),
                name: name.clone(),
                parameters: input.clone(),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, LlmError, Result as CoreResult};
    use crate::llm::{
        FinishReason, LlmResponse, MessageContent, MessageRole, ToolDefinition, Usage,
    };
    use crate::tools::{Tool, ToolRegistry};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// LLM client that replays a scripted sequence of responses and keeps
    /// a copy of every request it saw.
    struct ScriptedClient {
        script: Mutex<VecDeque<CoreResult<LlmResponse>>>,
        requests: Mutex<Vec<Vec<LlmMessage>>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<CoreResult<LlmResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn seen_requests(&self) -> Vec<Vec<LlmMessage>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn chat_completion(
            &self,
            messages: Vec<LlmMessage>,
            _tools: Option<Vec<ToolDefinition>>,
            _options: Option<ChatOptions>,
        ) -> CoreResult<LlmResponse> {
            self.requests.lock().unwrap().push(messages);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted client ran out of responses")
        }

        fn model_name(&self) -> &str {
            "scripted-model"
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    fn text_response(text: &str) -> CoreResult<LlmResponse> {
        Ok(LlmResponse {
            message: LlmMessage::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "scripted-model".to_string(),
            finish_reason: Some(FinishReason::Stop),
        })
    }

    fn tool_response(calls: &[(&str, &str, serde_json::Value)]) -> CoreResult<LlmResponse> {
        let blocks = calls
            .iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            })
            .collect();
        Ok(LlmResponse {
            message: LlmMessage {
                role: MessageRole::Assistant,
                content: MessageContent::Blocks(blocks),
            },
            usage: None,
            model: "scripted-model".to_string(),
            finish_reason: Some(FinishReason::ToolCalls),
        })
    }

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

        async fn execute(&self, call: ToolCall) -> CoreResult<ToolResult> {
            let text: String = call.get_parameter("text")?;
            Ok(ToolResult::success(call.id.as_str(), text.as_str()))
        }
    }

    /// Echoes after sleeping for the requested number of milliseconds.
    struct SlowEchoTool;

    #[async_trait]
    impl Tool for SlowEchoTool {
        fn name(&self) -> &str {
            "slow_echo"
        }

        fn description(&self) -> &str {
            "Echo after a delay"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}, "delay_ms": {"type": "integer"}}})
        }

        async fn execute(&self, call: ToolCall) -> CoreResult<ToolResult> {
            let text: String = call.get_parameter("text")?;
            let delay_ms: u64 = call.get_parameter_or("delay_ms", 0);
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            Ok(ToolResult::success(call.id.as_str(), text.as_str()))
        }
    }

    struct AlwaysFailTool;

    #[async_trait]
    impl Tool for AlwaysFailTool {
        fn name(&self) -> &str {
            "flaky"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, call: ToolCall) -> CoreResult<ToolResult> {
            Ok(ToolResult::error(call.id.as_str(), "backend unreachable"))
        }
    }

    /// Fails on the first call, succeeds afterwards.
    struct FailOnceTool {
        failed: std::sync::atomic::AtomicBool,
    }

    impl FailOnceTool {
        fn new() -> Self {
            Self {
                failed: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Tool for FailOnceTool {
        fn name(&self) -> &str {
            "fail_once"
        }

        fn description(&self) -> &str {
            "Fails on the first call only"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, call: ToolCall) -> CoreResult<ToolResult> {
            if self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                Ok(ToolResult::success(call.id.as_str(), "recovered"))
            } else {
                Ok(ToolResult::error(call.id.as_str(), "transient outage"))
            }
        }
    }

    fn agent_with(script: Vec<CoreResult<LlmResponse>>, max_iterations: usize) -> (Agent, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient::new(script));

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        registry.register(Box::new(SlowEchoTool)).unwrap();
        registry.register(Box::new(AlwaysFailTool)).unwrap();

        let agent = Agent::new(
            AgentConfig {
                max_turn_iterations: max_iterations,
                system_prompt: None,
            },
            client.clone(),
            registry.into_executor(),
            ChatOptions::default(),
            None,
        );
        (agent, client)
    }

    #[tokio::test]
    async fn plain_answer_finishes_in_one_iteration() {
        let (agent, client) = agent_with(vec![text_response("hello there")], 5);
        let mut history = ConversationHistory::new();

        let answer = agent.run_turn(&mut history, "hi").await.unwrap();

        assert_eq!(answer, "hello there");
        // user + assistant were appended
        assert_eq!(history.len(), 2);
        // the inference saw the prepended system prompt
        let requests = client.seen_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].role, MessageRole::System);
    }

    #[tokio::test]
    async fn tool_round_appends_results_in_request_order() {
        let (agent, client) = agent_with(
            vec![
                tool_response(&[
                    ("call_1", "echo", json!({"text": "first"})),
                    ("call_2", "echo", json!({"text": "second"})),
                ]),
                text_response("done"),
            ],
            5,
        );
        let mut history = ConversationHistory::with_system_prompt("sys");

        let answer = agent.run_turn(&mut history, "scaffold it").await.unwrap();
        assert_eq!(answer, "done");

        // system, user, assistant(tool calls), result 1, result 2, assistant
        assert_eq!(history.len(), 6);
        let messages = history.messages();
        assert!(messages[2].has_tool_use());
        for (message, expected_id) in messages[3..5].iter().zip(["call_1", "call_2"]) {
            assert_eq!(message.role, MessageRole::Tool);
            match &message.content {
                MessageContent::Blocks(blocks) => match &blocks[0] {
                    ContentBlock::ToolResult { tool_use_id, .. } => {
                        assert_eq!(tool_use_id, expected_id)
                    }
                    other => panic!("unexpected block: {:?}", other),
                },
                other => panic!("unexpected content: {:?}", other),
            }
        }

        // The second inference replayed the full history, results included.
        let requests = client.seen_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 5);
        assert_eq!(requests[1][4].role, MessageRole::Tool);
    }

    #[tokio::test]
    async fn concurrent_tools_still_append_in_request_order() {
        let (agent, _client) = agent_with(
            vec![
                tool_response(&[
                    ("call_slow", "slow_echo", json!({"text": "slow", "delay_ms": 80})),
                    ("call_fast", "slow_echo", json!({"text": "fast", "delay_ms": 0})),
                ]),
                text_response("done"),
            ],
            5,
        );
        let mut history = ConversationHistory::new();

        agent.run_turn(&mut history, "race them").await.unwrap();

        // Even though the fast call completes first, the slow call's
        // result is appended first because it was requested first.
        let messages = history.messages();
        let result_ids: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .map(|m| match &m.content {
                MessageContent::Blocks(blocks) => match &blocks[0] {
                    ContentBlock::ToolResult { tool_use_id, .. } => tool_use_id.as_str(),
                    _ => panic!("unexpected block"),
                },
                _ => panic!("unexpected content"),
            })
            .collect();
        assert_eq!(result_ids, vec!["call_slow", "call_fast"]);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_result_text_and_turn_recovers() {
        let (agent, _client) = agent_with(
            vec![
                tool_response(&[("call_1", "does_not_exist", json!({}))]),
                text_response("recovered"),
            ],
            5,
        );
        let mut history = ConversationHistory::new();

        let answer = agent.run_turn(&mut history, "try it").await.unwrap();
        assert_eq!(answer, "recovered");

        let result_message = &history.messages()[2];
        assert_eq!(result_message.role, MessageRole::Tool);
        match &result_message.content {
            MessageContent::Blocks(blocks) => match &blocks[0] {
                ContentBlock::ToolResult {
                    is_error, content, ..
                } => {
                    assert_eq!(*is_error, Some(true));
                    assert!(content.contains("not available"));
                }
                other => panic!("unexpected block: {:?}", other),
            },
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[tokio::test]
    async fn iteration_limit_fails_the_turn() {
        let script = (0..4)
            .map(|i| tool_response(&[(format!("call_{}", i).as_str(), "echo", json!({"text": "x"}))]))
            .collect();
        let (agent, client) = agent_with(script, 3);
        let mut history = ConversationHistory::new();

        let err = agent.run_turn(&mut history, "loop forever").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Agent(AgentError::TurnLimitExceeded { max_iterations: 3 })
        ));
        // Exactly the capped number of inferences happened.
        assert_eq!(client.seen_requests().len(), 3);
        // The completed exchanges stay in the history.
        assert!(history.len() > 1);
    }

    #[tokio::test]
    async fn inference_failure_leaves_history_untouched() {
        let (agent, _client) = agent_with(
            vec![Err(Error::Llm(LlmError::Network {
                message: "connection refused".to_string(),
            }))],
            5,
        );
        let mut history = ConversationHistory::with_system_prompt("sys");
        history.push(LlmMessage::user("earlier question"));
        history.push(LlmMessage::assistant("earlier answer"));
        let before = history.len();

        let err = agent.run_turn(&mut history, "new question").await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::Network { .. })));
        assert_eq!(history.len(), before);
    }

    #[tokio::test]
    async fn inference_failure_mid_turn_rolls_back_the_whole_turn() {
        let (agent, _client) = agent_with(
            vec![
                tool_response(&[("call_1", "echo", json!({"text": "ok"}))]),
                Err(Error::Llm(LlmError::RateLimit)),
            ],
            5,
        );
        let mut history = ConversationHistory::new();

        let err = agent.run_turn(&mut history, "question").await.unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::RateLimit)));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn second_consecutive_failure_carries_the_give_up_note() {
        let (agent, _client) = agent_with(
            vec![
                tool_response(&[("call_1", "flaky", json!({}))]),
                tool_response(&[("call_2", "flaky", json!({}))]),
                text_response("giving up"),
            ],
            5,
        );
        let mut history = ConversationHistory::new();

        agent.run_turn(&mut history, "search something").await.unwrap();

        let tool_messages: Vec<String> = history
            .messages()
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .map(|m| match &m.content {
                MessageContent::Blocks(blocks) => match &blocks[0] {
                    ContentBlock::ToolResult { content, .. } => content.clone(),
                    _ => panic!("unexpected block"),
                },
                _ => panic!("unexpected content"),
            })
            .collect();

        assert_eq!(tool_messages.len(), 2);
        assert!(!tool_messages[0].contains("Do not call it again"));
        assert!(tool_messages[1].contains("failed 2 times in a row"));
        assert!(tool_messages[1].contains("Do not call it again"));
    }

    #[tokio::test]
    async fn success_resets_the_failure_counter() {
        // fail_once fails, then succeeds (its counter resets); a different
        // tool fails once after that. No tool ever reaches two consecutive
        // failures, so no give-up note appears.
        let client = Arc::new(ScriptedClient::new(vec![
            tool_response(&[("call_1", "fail_once", json!({}))]),
            tool_response(&[("call_2", "fail_once", json!({}))]),
            tool_response(&[("call_3", "flaky", json!({}))]),
            text_response("done"),
        ]));

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(FailOnceTool::new())).unwrap();
        registry.register(Box::new(AlwaysFailTool)).unwrap();

        let agent = Agent::new(
            AgentConfig {
                max_turn_iterations: 10,
                system_prompt: None,
            },
            client,
            registry.into_executor(),
            ChatOptions::default(),
            None,
        );
        let mut history = ConversationHistory::new();

        agent.run_turn(&mut history, "go").await.unwrap();

        let tool_texts: Vec<String> = history
            .messages()
            .iter()
            .filter(|m| m.role == MessageRole::Tool)
            .map(|m| match &m.content {
                MessageContent::Blocks(blocks) => match &blocks[0] {
                    ContentBlock::ToolResult { content, .. } => content.clone(),
                    _ => panic!("unexpected block"),
                },
                _ => panic!("unexpected content"),
            })
            .collect();

        assert_eq!(tool_texts.len(), 3);
        // fail_once failed, then recovered; flaky failed only once.
        assert!(tool_texts.iter().all(|t| !t.contains("Do not call it again")));
    }

    #[tokio::test]
    async fn history_grows_monotonically_across_turns() {
        let (agent, _client) = agent_with(
            vec![text_response("answer one"), text_response("answer two")],
            5,
        );
        let mut history = ConversationHistory::new();

        agent.run_turn(&mut history, "first").await.unwrap();
        let after_first = history.len();
        agent.run_turn(&mut history, "second").await.unwrap();

        assert!(history.len() > after_first);
        // Earlier messages are still in place.
        assert_eq!(history.messages()[0].get_text().unwrap(), "first");
    }
}
