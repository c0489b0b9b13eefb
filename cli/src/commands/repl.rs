//! Interactive line-oriented REPL

use anyhow::Result;
use console::style;
use devmate_core::agent::build_system_prompt;
use devmate_core::{AgentBuilder, Config, ConversationHistory, TrajectoryRecorder};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Start the interactive session
pub async fn repl_command(config: Config, trajectory_file: Option<PathBuf>) -> Result<()> {
    let mut builder = AgentBuilder::new(config.clone());
    if let Some(path) = &trajectory_file {
        builder = builder.with_trajectory(TrajectoryRecorder::with_file(path));
    }
    let agent = builder.build()?;

    // The session history is owned here and threaded through every turn;
    // it carries the system prompt from the start.
    let mut history = ConversationHistory::with_system_prompt(build_system_prompt(
        config.agent.system_prompt.as_deref(),
        &agent.tool_names(),
    ));

    println!(
        "{} devmate ready (model: {}). Type 'exit' to quit.",
        style("*").green().bold(),
        config.llm.model
    );

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout
            .write_all(format!("\n{} ", style("you>").cyan().bold()).as_bytes())
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
            println!("Bye!");
            break;
        }

        // Ctrl-C aborts the in-flight turn, not the session. Dropping the
        // turn future is safe: history only ever grows by fully-appended
        // blocks, so the next turn starts from a clean log.
        tokio::select! {
            result = agent.run_turn(&mut history, input) => match result {
                Ok(answer) => {
                    println!("\n{} {}", style("devmate>").green().bold(), answer);
                }
                Err(e) => {
                    eprintln!("\n{} turn failed: {}", style("error:").red().bold(), e);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n{}", style("(turn aborted)").dim());
            }
        }
    }

    Ok(())
}
