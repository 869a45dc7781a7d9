//! Kino Telemetry CLI - Player Signal Replay Tool
//!
//! Features:
//! - Replay a recorded player signal script through the telemetry pipeline
//! - Print the resulting events, optionally delivering them to a collector
//! - Show the effective telemetry configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

mod commands;
mod output;

/// Kino Telemetry CLI - Playback telemetry toolkit
#[derive(Parser)]
#[command(name = "kino-telemetry")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Replay player signals through the Kino telemetry pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON Lines signal script
    Replay {
        /// Path to the script, one signal per line
        script: PathBuf,

        /// Telemetry configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Deliver events to this collector endpoint
        #[arg(long)]
        collector: Option<Url>,
    },

    /// Print the effective configuration
    Config {
        /// Telemetry configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { script, config, collector } => {
            let config = commands::load_config(config.as_deref(), collector, cli.verbose)?;
            kino_telemetry::logging::init(&config.log, None)?;
            commands::replay(&script, &config, &cli.format).await?;
        }
        Commands::Config { config } => {
            let config = commands::load_config(config.as_deref(), None, cli.verbose)?;
            commands::show_config(&config, &cli.format)?;
        }
    }

    Ok(())
}
