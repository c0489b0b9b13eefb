//! Tool registry for managing available tools

use crate::error::{Result, ToolError};
use crate::tools::{Tool, ToolExecutor};
use std::collections::HashMap;

/// Registry of callable tools, keyed by unique name.
///
/// Populated once at startup and then frozen into a [`ToolExecutor`];
/// after that point the tool set never changes, so dispatch reads are
/// lock-free.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// Registering a second tool under an existing name is a startup-time
    /// configuration fault and fails with [`ToolError::Duplicate`].
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate { name }.into());
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name
    pub fn lookup(&self, name: &str) -> Result<&dyn Tool> {
        self.tools
            .get(name)
            .map(|t| t.as_ref())
            .ok_or_else(|| {
                ToolError::NotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// List all registered tool names, sorted
    pub fn list_tools(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get name and description for a registered tool
    pub fn get_tool_info(&self, name: &str) -> Option<(&str, &str)> {
        self.tools
            .get(name)
            .map(|tool| (tool.name(), tool.description()))
    }

    /// Freeze the registry into an executor
    pub fn into_executor(self) -> ToolExecutor {
        let mut executor = ToolExecutor::new();
        for (_, tool) in self.tools {
            executor.register_tool(tool);
        }
        executor
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
