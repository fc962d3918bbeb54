//! vaultsync CLI - command-line interface for the bidirectional
//! filesystem<->archive sync engine.
//!
//! Provides commands for:
//! - Running a one-shot sync in either direction
//! - Listing pending changes and previewing a single file's diff
//! - Viewing and editing configuration
//! - Generating shell completions

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::completions::CompletionsCommand;
use commands::config::ConfigCommand;
use commands::diff_file::DiffFileCommand;
use commands::status::StatusCommand;
use commands::sync::SyncCommand;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "vaultsync", version, about = "Bidirectional filesystem <-> archive sync engine")]
pub struct Cli {
    /// Output in JSON format.
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a one-shot sync between a folder and an archive.
    Sync(SyncCommand),
    /// List pending changes without applying them.
    Status(StatusCommand),
    /// Preview a single file's pending diff.
    DiffFile(DiffFileCommand),
    /// View and edit configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions.
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Human };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format).await,
        Commands::Status(cmd) => cmd.execute(format).await,
        Commands::DiffFile(cmd) => cmd.execute(format).await,
        Commands::Config(cmd) => cmd.execute(format).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    }
}
