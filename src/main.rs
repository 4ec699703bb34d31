//! MCP Agent - command-line entry point
//!
//! Spawns the MCP tool server, runs one task through the agent loop, and
//! prints the final answer. Exits non-zero when the run does not complete.

use std::sync::Arc;

use mcp_agent::agent::{Agent, Outcome};
use mcp_agent::llm::GeminiClient;
use mcp_agent::tools::mcp::McpTransport;
use mcp_agent::Config;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcp_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; a task on the command line wins over AGENT_QUERY
    let mut config = Config::from_env()?;
    let cli_task = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !cli_task.trim().is_empty() {
        config.query = cli_task;
    }
    info!(
        "Loaded configuration: max_iterations={}, timeout={}s",
        config.agent.max_iterations,
        config.agent.llm_timeout.as_secs()
    );

    let llm = Arc::new(GeminiClient::new(
        config.api_key.clone(),
        config.default_model.clone(),
    ));
    info!("Using Gemini model {}", llm.model());
    let transport = Arc::new(McpTransport::spawn(&config.mcp_command, &config.mcp_args).await?);

    let agent = Agent::connect(config.agent.clone(), llm, transport.clone()).await?;
    for line in agent.catalog().lines() {
        info!("Added description for tool: {}", line);
    }

    let run = agent.run_task(&config.query).await;
    drop(agent);

    match Arc::try_unwrap(transport) {
        Ok(transport) => transport.shutdown().await,
        Err(_) => warn!("MCP transport still in use; leaving server to exit on its own"),
    }

    info!(
        "Run {} finished after {} tool iteration(s)",
        run.id, run.iterations
    );

    match run.outcome {
        Outcome::Completed {
            answer, reasoning, ..
        } => {
            println!("Final reasoning: {}", reasoning);
            println!("Final answer: {}", answer);
            println!("\n=== Agent Execution Complete ===");
            Ok(())
        }
        Outcome::BudgetExhausted { max_iterations } => {
            if let Some(last) = &run.last_result {
                warn!("Last tool result: [{}]", last.join(", "));
            }
            Err(anyhow::anyhow!(
                "Max iterations ({}) reached without completion",
                max_iterations
            ))
        }
        Outcome::Failed(error) => Err(anyhow::anyhow!("{} [{}]", error, error.kind())),
    }
}
