//! sheetsync CLI - Push tabular data into a Feishu spreadsheet
//!
//! Provides commands for:
//! - Synchronizing a local JSON, CSV or workbook dataset with one of four modes
//! - Previewing the writes a sync would make
//! - Viewing, validating and creating the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod input;
mod output;

use commands::{config::ConfigCommand, sync::SyncCommand};
use output::OutputFormat;
use sheetsync_core::config::Config;

#[derive(Debug, Parser)]
#[command(name = "sheetsync", version, about = "Bulk-sync tabular data into Feishu Sheets")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Synchronize a local dataset into the configured sheet
    Sync(SyncCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Default log directive: flags first, then the configured level
fn log_directive(verbose: u8, quiet: bool, configured: &str) -> String {
    match (quiet, verbose) {
        (true, _) => "warn".to_string(),
        (false, 0) => configured.to_string(),
        (false, 1) => "debug".to_string(),
        (false, _) => "trace".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    // Setup tracing; RUST_LOG wins over flags and config
    let configured = Config::load_or_default(&config_path).logging.level;
    let directive = log_directive(cli.verbose, cli.quiet, &configured);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&config_path, format).await,
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
    }
}
