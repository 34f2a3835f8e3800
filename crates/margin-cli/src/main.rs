//! margin CLI
//!
//! Command-line interface for margin - replays scripted reading sessions
//! through the highlight engine.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use margin_core::Config;

mod commands;
mod output;
mod script;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "margin")]
#[command(about = "margin - Keep page highlights in sync with stored highlights")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted reading session
    Replay {
        /// Path to the script (TOML)
        script: PathBuf,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (editable, search_integration, gated_by_feature_flag, location_id, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

// The engine and its collaborators are single-threaded
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Config { command } => handle_config_command(command, config_path, &output),
        Commands::Replay { script } => {
            let config = Config::load_with_cli_override(config_path)
                .context("Failed to load configuration")?;
            init_logging(&config);
            commands::replay::replay(&script, &config, &output).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if MARGIN_LOG environment variable is set.
/// Logs to config.log_file when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("MARGIN_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "margin_core={},margin_cli={}",
        log_level, log_level
    ));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
