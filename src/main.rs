//! Reward Monitor - concentration and manipulation analysis for Base reward programs
//!
//! Reads decoded ERC-20 transfer events, attributes them to reward programs
//! and reports how concentrated each distribution is.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

use reward_monitor::cli::commands;
use reward_monitor::config::Config;

/// Reward Monitor - reward distribution concentration analysis
#[derive(Parser)]
#[command(name = "reward-monitor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml", env = "REWARD_MONITOR_CONFIG")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "REWARD_MONITOR_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze transfer records and print the combined report
    Analyze {
        /// Transfer files (JSON array or JSON lines); later files are fallbacks
        #[arg(short, long = "input", value_name = "FILE")]
        inputs: Vec<PathBuf>,

        /// Override the analysis window in hours
        #[arg(long)]
        window_hours: Option<f64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print daily transfer totals with running sums
    History {
        /// Transfer files (JSON array or JSON lines); later files are fallbacks
        #[arg(short, long = "input", value_name = "FILE")]
        inputs: Vec<PathBuf>,

        /// Days of history (default from [analysis].history_days)
        #[arg(long)]
        days: Option<u32>,

        /// Print the history as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score Farcaster cast activity concentration among authors
    Activity {
        /// Cast file (JSON array or JSON lines)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Override the analysis window in hours
        #[arg(long)]
        window_hours: Option<f64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify contracts from a metadata file
    Classify {
        /// Contract metadata file (JSON array)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Print classifications as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so JSON reports stay clean on stdout
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("reward_monitor=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!(config = %cli.config, categories = config.categories.len(), "Configuration loaded");

    // Execute command
    let result = match cli.command {
        Commands::Analyze {
            inputs,
            window_hours,
            json,
        } => commands::analyze(&config, &inputs, window_hours, json).await,
        Commands::History { inputs, days, json } => {
            commands::history(&config, &inputs, days, json).await
        }
        Commands::Activity {
            input,
            window_hours,
            json,
        } => commands::activity(&config, &input, window_hours, json).await,
        Commands::Classify { input, json } => commands::classify(&config, &input, json).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_json_flag() {
        let cli = Cli::try_parse_from(["reward-monitor", "config"]).unwrap();
        assert!(!cli.log_json);

        let cli = Cli::try_parse_from(["reward-monitor", "history", "--log-json", "--days", "7"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::History { days: Some(7), .. }));
    }
}
