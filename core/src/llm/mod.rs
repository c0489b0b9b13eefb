//! LLM client abstractions and implementations

pub mod client;
pub mod embedding;
pub mod message;
pub mod providers;

pub use client::{
    ChatOptions, FinishReason, FunctionDefinition, LlmClient, LlmResponse, ToolDefinition, Usage,
};
pub use embedding::{EmbeddingClient, OpenAiEmbeddingClient};
pub use message::{ContentBlock, ConversationHistory, LlmMessage, MessageContent, MessageRole};
pub use providers::OpenAiClient;
