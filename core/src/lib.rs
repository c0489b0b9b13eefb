//! # devmate Core
//!
//! Core library for devmate - a tool-using assistant that answers
//! questions and produces files by alternating between model inference and
//! tool execution.
//!
//! The building blocks: a conversation orchestrator ([`agent::Agent`]),
//! a frozen tool registry with three built-in tools (local-docs retrieval,
//! sandboxed file writing, web search through a spawned worker process),
//! a persisted vector index with an offline ingestion step, and an
//! OpenAI-compatible model boundary.

// Core modules
pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod rag;
pub mod tools;
pub mod trajectory;

// Re-export commonly used types
pub use agent::{Agent, AgentBuilder, AgentConfig};
pub use config::Config;
pub use llm::ConversationHistory;
pub use trajectory::TrajectoryRecorder;

/// Current version of the devmate-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Initialize tracing with a specific debug mode
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
