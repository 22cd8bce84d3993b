//! Config command - configuration management.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use geode_session_config::{self, GeodeSessionConfig, HasSessionConfig};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./geode-session.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { local } => cmd_init(ctx, local),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let mut resolved = GeodeSessionConfig::with_defaults();
    resolved.merge(loaded.config.clone());

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    println!("# geode-session Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    println!("Session:");
    println!("  region           {}", resolved.region_name());
    println!("  serializer       {}", resolved.serializer_name());
    println!(
        "  max inactive     {}s",
        resolved.max_inactive_interval_secs()
    );
    println!();

    let pool = resolved.pool_or_default();
    println!("Pool '{}':", pool.name);
    for server in &pool.servers {
        println!("  {server}");
    }
    println!();

    print!("{}", resolved.to_toml()?);

    for warning in &loaded.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} [{}] {}", status, source.layer, source.path.display());
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'gsession config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(ctx: &Context, local: bool) -> Result<()> {
    let path = if local {
        geode_session_config::project_config_path(Path::new("."))
    } else {
        ctx.user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    geode_session_config::save_config(&GeodeSessionConfig::with_defaults(), &path)?;
    println!("Created {}", path.display());
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    if let Some(path) = ctx.user_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}
