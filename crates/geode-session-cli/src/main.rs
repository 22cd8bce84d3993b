//! gsession - inspect and exercise geode-session replication
//!
//! Main entry point for the gsession CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod commands;

use commands::{config, decode, demo};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// gsession - session replication with delta serialization
#[derive(Parser)]
#[command(name = "gsession")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: platform config dir)
    #[arg(long, global = true, env = "GEODE_SESSION_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a session lifecycle against an in-process region
    Demo(demo::DemoArgs),

    /// Decode a session or attributes frame from a file
    Decode(decode::DecodeArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = geode_session_config::load_config(None, cli.config_dir.as_deref());
    let logging = loaded.config.logging_or_default();

    // Console (human-readable, stderr) + optional rotating JSON file
    let console_filter = if cli.verbose {
        "gsession=debug,geode_session=debug,geode_session_config=debug,info".to_string()
    } else {
        format!("gsession={0},geode_session={0},warn", logging.level)
    };

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(geode_session_config::user_config_dir);
    let (json_layer, _guard) = match config_dir.filter(|_| logging.json_file) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir.join("logs"), "gsession.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "gsession=trace,geode_session=trace,geode_session_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&console_filter)),
                ),
        )
        .with(json_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config_dir,
        loaded,
    };

    match cli.command {
        Commands::Demo(args) => demo::run(args, &ctx).await,
        Commands::Decode(args) => decode::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
