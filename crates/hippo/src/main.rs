//! Hippo - semantic long-term memory for conversational agents
//!
//! Main entry point for the Hippo CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, files, flush, memory, tool};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Hippo - semantic long-term memory for conversational agents
#[derive(Parser)]
#[command(name = "hippo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Agent workspace holding MEMORY.md and memory/
    #[arg(long, global = true, env = "HIPPO_WORKSPACE", default_value = ".")]
    pub workspace: PathBuf,

    /// Directory the memory store lives in
    #[arg(long, global = true, env = "HIPPO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recall, capture, store and forget memories
    Memory(memory::MemoryArgs),

    /// Index and search workspace memory files
    Files(files::FilesArgs),

    /// List and invoke the agent memory tools
    Tool(tool::ToolArgs),

    /// Print the pre-compaction memory flush prompt
    FlushPrompt(flush::FlushArgs),

    /// Configuration inspection
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "hippo=debug,hippo_agent=debug,hippo_memory=debug,hippo_embed=debug,hippo_config=debug,info"
    } else {
        "hippo=info,hippo_agent=warn,hippo_memory=warn,hippo_embed=warn,warn"
    };

    let log_dir = hippo_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "hippo.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "hippo=trace,hippo_agent=trace,hippo_memory=trace,hippo_embed=trace,hippo_config=trace,info",
                )),
        )
        .init();

    let data_dir = cli
        .data_dir
        .or_else(hippo_config::default_data_dir)
        .unwrap_or_else(|| PathBuf::from(".hippo"));

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        workspace: cli.workspace,
        data_dir,
    };

    match cli.command {
        Commands::Memory(args) => memory::run(args, &ctx).await,
        Commands::Files(args) => files::run(args, &ctx).await,
        Commands::Tool(args) => tool::run(args, &ctx).await,
        Commands::FlushPrompt(args) => flush::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
