//! `agentloop ask` — Single-question or interactive mode.

use std::sync::Arc;

use agentloop_agent::{AgentExecutor, RunResult, RunStatus, policy_for};
use agentloop_config::{AppConfig, PolicyKind};
use agentloop_memory::{EntityMemory, InMemoryEntityStore};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Flags that override the loaded configuration for this invocation.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub policy: Option<PolicyKind>,
    pub max_iterations: Option<u32>,
    pub show_trajectory: bool,
    pub json: bool,
}

pub async fn run(message: Option<String>, options: AskOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let provider = agentloop_providers::build_from_config(&config).map_err(|e| {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set AGENTLOOP_API_KEY or OPENAI_API_KEY, or add api_key to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        format!("Provider not available: {e}")
    })?;

    let policy_kind = options.policy.unwrap_or(config.agent.policy);
    let tools = Arc::new(agentloop_tools::registry_for(policy_kind, &config.tools)?);

    let mut executor = AgentExecutor::new(
        provider.clone(),
        &config.model,
        policy_for(policy_kind),
        tools.clone(),
    )?
    .with_temperature(config.temperature);
    if let Some(max) = config.max_tokens {
        executor = executor.with_max_tokens(max);
    }
    if config.memory.entities {
        let memory = EntityMemory::new(
            provider,
            &config.model,
            Arc::new(InMemoryEntityStore::new()),
        )
        .with_history_turns(config.memory.history_turns);
        executor = executor.with_context(Arc::new(memory));
    }

    let mut run_config = config.agent.run_config();
    if let Some(max) = options.max_iterations {
        run_config = run_config.with_max_iterations(max);
    }

    if let Some(question) = message {
        let result = executor.run(&question, &run_config).await?;
        print_result(&result, &options)?;
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  agentloop — interactive mode");
    println!();
    println!("  Policy:  {policy_kind}");
    println!("  Model:   {}", config.model);
    println!("  Tools:   {}", tools.names().join(", "));
    println!("  Memory:  {}", if config.memory.entities { "entities" } else { "off" });
    println!();
    println!("  Type a question and press Enter. Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"  You > ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match executor.run(question, &run_config).await {
            Ok(result) => {
                println!();
                print_result(&result, &options)?;
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    Ok(())
}

fn print_result(result: &RunResult, options: &AskOptions) -> Result<(), serde_json::Error> {
    if options.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    if options.show_trajectory {
        print!("{}", format_trajectory(result));
    }
    if let RunStatus::Stopped { reason } = result.status {
        eprintln!("  (stopped: {reason})");
    }
    println!("{}", result.output);
    Ok(())
}

/// Human-readable listing of the steps a run took.
pub fn format_trajectory(result: &RunResult) -> String {
    let mut out = String::new();
    for (i, step) in result.trajectory.steps().iter().enumerate() {
        out.push_str(&format!("  [{}] {}: {}\n", i + 1, step.action, step.action_input));
        out.push_str(&format!("      → {}\n", step.observation));
    }
    out.push_str(&format!(
        "  ({} iterations, {} model calls)\n",
        result.iterations, result.model_calls
    ));
    out
}
