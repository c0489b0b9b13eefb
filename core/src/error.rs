//! Error types and handling for devmate core

use thiserror::Error;

/// Result type alias for devmate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for devmate core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// LLM client errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Tool execution errors
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Agent execution errors
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// Knowledge retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Trajectory recording errors
    #[error("Trajectory error: {0}")]
    Trajectory(#[from] TrajectoryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for field '{field}': {value}")]
    InvalidValue { field: String, value: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid configuration format")]
    InvalidFormat,
}

/// LLM client errors.
///
/// Not recoverable by the model (there is nobody to hand them to); they
/// surface to the turn caller as a turn-level failure.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Inference timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Tool execution errors.
///
/// Everything except `Duplicate` is caught at the dispatcher and converted
/// to ToolResult text so the model can react. `Duplicate` is a startup-time
/// configuration fault and is fatal before any session begins.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Tool already registered: {name}")]
    Duplicate { name: String },

    #[error("Tool execution failed: {name} - {message}")]
    ExecutionFailed { name: String, message: String },

    #[error("Invalid tool parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Tool call timed out: {name}")]
    Timeout { name: String },

    #[error("Worker process failed to start: {message}")]
    ProcessStart { message: String },

    #[error("Worker handshake timed out after {seconds}s")]
    HandshakeTimeout { seconds: u64 },
}

/// Agent execution errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Turn iteration limit exceeded: {max_iterations}")]
    TurnLimitExceeded { max_iterations: usize },

    #[error("Turn execution failed: {message}")]
    TurnFailed { message: String },
}

/// Knowledge retrieval errors
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Knowledge index unavailable at {path}: {message}")]
    IndexUnavailable { path: String, message: String },

    #[error("Index format invalid: {message}")]
    InvalidIndex { message: String },

    #[error("Embedding request failed: {message}")]
    EmbeddingFailed { message: String },
}

/// Trajectory recording errors
#[derive(Error, Debug)]
pub enum TrajectoryError {
    #[error("Failed to record trajectory: {message}")]
    RecordingFailed { message: String },

    #[error("Failed to load trajectory: {path}")]
    LoadFailed { path: String },

    #[error("Invalid trajectory format")]
    InvalidFormat,
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Generic(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Generic(msg.to_string())
    }
}
