//! Trajectory entry structures

use crate::llm::{LlmMessage, Usage};
use crate::tools::{ToolCall, ToolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in the execution trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// Unique identifier for this entry
    pub id: String,

    /// Timestamp when this entry was created
    pub timestamp: DateTime<Utc>,

    /// Type of entry
    pub entry_type: EntryType,
}

/// Type of trajectory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryType {
    /// A user turn started
    TurnStart { user_input: String },

    /// LLM request sent
    LlmRequest {
        message_count: usize,
        model: String,
        iteration: usize,
    },

    /// LLM response received
    LlmResponse {
        message: LlmMessage,
        usage: Option<Usage>,
        iteration: usize,
    },

    /// A tool call and its result
    ToolExchange {
        call: ToolCall,
        result: ToolResult,
        iteration: usize,
    },

    /// The turn produced its final answer
    TurnComplete {
        final_text: String,
        iterations: usize,
    },

    /// Error occurred
    Error { error: String },
}

impl TrajectoryEntry {
    /// Create a new trajectory entry
    pub fn new(entry_type: EntryType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entry_type,
        }
    }

    /// Create a turn start entry
    pub fn turn_start(user_input: String) -> Self {
        Self::new(EntryType::TurnStart { user_input })
    }

    /// Create an LLM request entry
    pub fn llm_request(message_count: usize, model: String, iteration: usize) -> Self {
        Self::new(EntryType::LlmRequest {
            message_count,
            model,
            iteration,
        })
    }

    /// Create an LLM response entry
    pub fn llm_response(message: LlmMessage, usage: Option<Usage>, iteration: usize) -> Self {
        Self::new(EntryType::LlmResponse {
            message,
            usage,
            iteration,
        })
    }

    /// Create a tool exchange entry
    pub fn tool_exchange(call: ToolCall, result: ToolResult, iteration: usize) -> Self {
        Self::new(EntryType::ToolExchange {
            call,
            result,
            iteration,
        })
    }

    /// Create a turn complete entry
    pub fn turn_complete(final_text: String, iterations: usize) -> Self {
        Self::new(EntryType::TurnComplete {
            final_text,
            iterations,
        })
    }

    /// Create an error entry
    pub fn error(error: String) -> Self {
        Self::new(EntryType::Error { error })
    }
}
