//! CLI-side configuration discovery

pub mod loader;

pub use loader::{CliConfigLoader, RawConfig};
