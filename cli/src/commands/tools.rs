//! Tool listing command

use anyhow::Result;
use console::style;
use devmate_core::agent::builtin_registry;
use devmate_core::Config;

/// Print the registered tools and their descriptions
pub async fn tools_command(config: Config) -> Result<()> {
    let registry = builtin_registry(&config)?;

    println!("Available tools:\n");
    for name in registry.list_tools() {
        if let Some((_, description)) = registry.get_tool_info(name) {
            let summary = description.lines().next().unwrap_or("");
            println!("  {} - {}", style(name).cyan().bold(), summary);
        }
    }

    Ok(())
}
