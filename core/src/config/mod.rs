//! Configuration types accepted by core

pub mod types;

pub use types::{
    Config, LlmSettings, ModelParams, RetrievalSettings, SandboxSettings, WorkerSettings,
};
