//! Resolved configuration types for devmate core
//!
//! Core only accepts fully resolved, validated configuration. All
//! discovery, loading and merging happens in the CLI layer. The resulting
//! struct is constructed once at startup and passed by ownership into the
//! components that need it; there are no ambient globals.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Model parameters for LLM requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelParams {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling
    pub temperature: Option<f32>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Resolved LLM endpoint settings (chat and embeddings share the endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Chat model name
    pub model: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Model parameters
    #[serde(default)]
    pub params: ModelParams,
}

impl LlmSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }
        if self.model.is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }
        if let Some(temp) = self.params.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }
        if let Some(top_p) = self.params.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err("Top-p must be between 0.0 and 1.0".to_string());
            }
        }
        Ok(())
    }
}

/// Settings for the knowledge retriever and the offline ingestion step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Path of the persisted vector index file
    pub index_path: PathBuf,
    /// Directory scanned for markdown documents during ingestion
    pub docs_dir: PathBuf,
    /// Character length of each chunk
    pub chunk_size: usize,
    /// Character overlap between adjacent chunks
    pub chunk_overlap: usize,
    /// Number of chunks returned per query
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("devmate_index.json"),
            docs_dir: PathBuf::from("docs"),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 2,
        }
    }
}

/// Settings for the file-write sandbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxSettings {
    /// Root directory under which every file write is confined
    pub root: PathBuf,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("output"),
        }
    }
}

/// Settings for the external search worker process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Command used to spawn the worker (argv, first element is the program)
    pub command: Vec<String>,
    /// Extra environment variables passed to the worker
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory for the worker, if different from the current one
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Seconds allowed for the initialize handshake
    pub handshake_timeout_secs: u64,
    /// Seconds allowed for a single tool call
    pub call_timeout_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            command: vec!["devmate-search".to_string()],
            env: HashMap::new(),
            working_dir: None,
            handshake_timeout_secs: 10,
            call_timeout_secs: 30,
        }
    }
}

/// The complete resolved configuration handed to core at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM endpoint settings
    pub llm: LlmSettings,
    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    /// Sandbox settings
    #[serde(default)]
    pub sandbox: SandboxSettings,
    /// Search worker settings
    #[serde(default)]
    pub worker: WorkerSettings,
    /// Agent settings
    #[serde(default)]
    pub agent: crate::agent::AgentConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.llm.validate()?;

        if self.retrieval.chunk_size == 0 {
            return Err("chunk_size must be positive".to_string());
        }
        if self.retrieval.chunk_overlap >= self.retrieval.chunk_size {
            return Err("chunk_overlap must be smaller than chunk_size".to_string());
        }
        if self.worker.command.is_empty() {
            return Err("Worker command cannot be empty".to_string());
        }
        if self.agent.max_turn_iterations == 0 {
            return Err("max_turn_iterations must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_llm() -> LlmSettings {
        LlmSettings {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            params: ModelParams::default(),
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        let config = Config {
            llm: sample_llm(),
            retrieval: RetrievalSettings::default(),
            sandbox: SandboxSettings::default(),
            worker: WorkerSettings::default(),
            agent: crate::agent::AgentConfig::default(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let mut llm = sample_llm();
        llm.api_key.clear();
        assert!(llm.validate().is_err());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let mut config = Config {
            llm: sample_llm(),
            retrieval: RetrievalSettings::default(),
            sandbox: SandboxSettings::default(),
            worker: WorkerSettings::default(),
            agent: crate::agent::AgentConfig::default(),
        };
        config.retrieval.chunk_overlap = config.retrieval.chunk_size;
        assert!(config.validate().is_err());
    }
}
