//! Sift CLI
//!
//! Main entry point for the sift command-line tool.
//! Answers questions over a document corpus with sub-question decomposition,
//! reranking and multi-turn follow-ups.

mod commands;
mod session;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, PromptsCommand};
use sift_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Sift - retrieval-augmented answers with query decomposition
#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Retrieval-augmented answers with query decomposition", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SIFT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion provider (ollama, openai)
    #[arg(short, long, global = true, env = "SIFT_PROVIDER")]
    provider: Option<String>,

    /// Provider endpoint URL
    #[arg(short, long, global = true, env = "SIFT_ENDPOINT")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question, optionally continuing a saved conversation
    Ask(AskCommand),

    /// Interactive conversation over a corpus
    Chat(ChatCommand),

    /// Show active prompt templates and their origin
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration from file and environment
    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.endpoint,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Sift CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Models: {:?}", config.models);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
