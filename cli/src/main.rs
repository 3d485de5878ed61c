// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Volunteer Hub CLI
//!
//! The `vhub` binary runs the volunteer workflow HTTP server and carries the
//! operator commands around it.
//!
//! ## Commands
//!
//! - `vhub serve` - Run the HTTP API in the foreground
//! - `vhub migrate` - Apply the PostgreSQL schema
//! - `vhub config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use volunteer_hub::commands::{self, ConfigCommand};
use volunteer_hub::daemon;
use volunteer_hub_core::domain::hub_config::HubConfigManifest;

/// Volunteer Hub - onboarding and task assignment for community events
#[derive(Parser)]
#[command(name = "vhub")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "VHUB_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port (default: from configuration)
    #[arg(long, global = true, env = "VHUB_PORT")]
    port: Option<u16>,

    /// HTTP API host (default: from configuration)
    #[arg(long, global = true, env = "VHUB_HOST")]
    host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "VHUB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (text, json)
    #[arg(long, global = true, env = "VHUB_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    #[command(name = "serve")]
    Serve,

    /// Apply the database schema
    #[command(name = "migrate")]
    Migrate,

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env-backed flags
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // File logging settings apply unless overridden; load errors surface in the command itself
    let logging = HubConfigManifest::load_or_default(cli.config.clone())
        .map(|c| c.spec.observability.logging)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    let format = cli.log_format.clone().unwrap_or(logging.format);
    init_logging(&level, &format)?;

    match cli.command {
        Some(Commands::Serve) => {
            info!("Starting Volunteer Hub server");
            daemon::start_server(cli.config, cli.host, cli.port).await
        }
        Some(Commands::Migrate) => commands::migrate::run(cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
