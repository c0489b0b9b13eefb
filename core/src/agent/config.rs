//! Agent configuration and builder

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::llm::{ChatOptions, LlmClient, OpenAiClient, OpenAiEmbeddingClient};
use crate::rag::Retriever;
use crate::tools::builtin::{SearchLocalDocsTool, SearchWebTool, WriteFileTool};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::trajectory::TrajectoryRecorder;

/// Configuration for the agent loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model-inference iterations per user turn.
    ///
    /// Bounds tool-call ping-pong: once the cap is reached the turn fails
    /// with `AgentError::TurnLimitExceeded` instead of looping forever.
    pub max_turn_iterations: usize,

    /// Custom system prompt (optional).
    /// If not provided, the default operating rules are used.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turn_iterations: 15,
            system_prompt: None,
        }
    }
}

/// Wire the built-in tools against resolved configuration.
///
/// Registration order is fixed; a name collision here is a programming
/// error and fails startup with `ToolError::Duplicate`.
pub fn builtin_registry(config: &Config) -> Result<ToolRegistry> {
    let embedder = Arc::new(OpenAiEmbeddingClient::new(&config.llm));
    let retriever = Arc::new(Retriever::new(&config.retrieval, embedder));

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchLocalDocsTool::new(
        retriever,
        config.retrieval.top_k,
    )))?;
    registry.register(Box::new(WriteFileTool::new(config.sandbox.root.clone())))?;
    registry.register(Box::new(SearchWebTool::new(config.worker.clone())))?;
    Ok(registry)
}

/// Builder for creating agents from resolved configuration
pub struct AgentBuilder {
    config: Config,
    trajectory: Option<TrajectoryRecorder>,
}

impl AgentBuilder {
    /// Create a new agent builder
    pub fn new(config: Config) -> Self {
        Self {
            config,
            trajectory: None,
        }
    }

    /// Attach a trajectory recorder
    pub fn with_trajectory(mut self, recorder: TrajectoryRecorder) -> Self {
        self.trajectory = Some(recorder);
        self
    }

    /// Build the agent with the default LLM client and built-in tools
    pub fn build(self) -> Result<super::Agent> {
        let llm_client: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(&self.config.llm)?);
        let executor = builtin_registry(&self.config)?.into_executor();
        Ok(self.assemble(llm_client, executor))
    }

    /// Build the agent with an explicit client and executor (used by tests
    /// and by callers that bring their own tool set)
    pub fn build_with(
        self,
        llm_client: Arc<dyn LlmClient>,
        executor: ToolExecutor,
    ) -> super::Agent {
        self.assemble(llm_client, executor)
    }

    fn assemble(self, llm_client: Arc<dyn LlmClient>, executor: ToolExecutor) -> super::Agent {
        let params = &self.config.llm.params;
        let defaults = ChatOptions::default();
        let chat_options = ChatOptions {
            max_tokens: params.max_tokens.or(defaults.max_tokens),
            temperature: params.temperature.or(defaults.temperature),
            top_p: params.top_p.or(defaults.top_p),
            timeout_secs: params.timeout_secs.or(defaults.timeout_secs),
        };

        super::Agent::new(
            self.config.agent,
            llm_client,
            executor,
            chat_options,
            self.trajectory,
        )
    }
}
