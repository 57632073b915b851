//! agentloop CLI — the main entry point.
//!
//! Commands:
//! - `ask`     — Answer a question with an agent (single-shot or interactive)
//! - `tools`   — List the tools a policy would run with
//! - `config`  — Show, locate or initialize the configuration file

use agentloop_config::PolicyKind;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agentloop",
    about = "agentloop — prompt, parse, act, repeat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent a question
    Ask {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Agent policy (self-ask-with-search, zero-shot-react)
        #[arg(short, long)]
        policy: Option<PolicyKind>,

        /// Override the iteration limit
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Print every step after the answer
        #[arg(long)]
        show_trajectory: bool,

        /// Print the full run result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tools available to a policy
    Tools {
        #[arg(short, long)]
        policy: Option<PolicyKind>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay pipeable
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask {
            message,
            policy,
            max_iterations,
            show_trajectory,
            json,
        } => {
            let options = commands::ask::AskOptions {
                policy,
                max_iterations,
                show_trajectory,
                json,
            };
            commands::ask::run(message, options).await?
        }
        Commands::Tools { policy } => commands::tools::run(policy).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
        },
    }

    Ok(())
}
