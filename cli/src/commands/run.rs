//! Single task execution command

use anyhow::Result;
use devmate_core::agent::build_system_prompt;
use devmate_core::{AgentBuilder, Config, ConversationHistory, TrajectoryRecorder};
use std::path::PathBuf;
use tracing::info;

/// Execute a single task and print the final answer
pub async fn run_command(
    task: String,
    config: Config,
    trajectory_file: Option<PathBuf>,
) -> Result<()> {
    info!(model = %config.llm.model, "executing task");

    let mut builder = AgentBuilder::new(config.clone());
    if let Some(path) = &trajectory_file {
        builder = builder.with_trajectory(TrajectoryRecorder::with_file(path));
        info!(path = %path.display(), "trajectory recording enabled");
    }
    let agent = builder.build()?;

    let mut history = ConversationHistory::with_system_prompt(build_system_prompt(
        config.agent.system_prompt.as_deref(),
        &agent.tool_names(),
    ));

    let answer = agent.run_turn(&mut history, &task).await?;
    println!("{}", answer);

    Ok(())
}
