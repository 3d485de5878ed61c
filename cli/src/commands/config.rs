// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use volunteer_hub_core::domain::hub_config::{HubConfigManifest, StorageKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./vhub-config.yaml)
        #[arg(short, long, default_value = "./vhub-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = HubConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. VHUB_CONFIG_PATH: {}",
            std::env::var("VHUB_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./vhub-config.yaml");
        println!("  4. ~/.vhub/config.yaml");
        println!("  5. /etc/vhub/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    println!("  Name: {}", config.metadata.name);
    println!();

    let spec = &config.spec;
    println!("{}", "Storage:".bold());
    match spec.storage.backend {
        StorageKind::Memory => println!("  Backend: memory"),
        StorageKind::Postgres => {
            println!("  Backend: postgres");
            // Connection strings carry credentials; only show references
            let url = spec.storage.database_url.as_deref().unwrap_or("(not set)");
            if url.starts_with("env:") {
                println!("  Database URL: {}", url);
            } else {
                println!("  Database URL: {}", "(literal, hidden)".dimmed());
            }
            println!("  Max connections: {}", spec.storage.max_connections);
        }
    }
    println!();

    println!("{}", "Network:".bold());
    println!("  Listen: {}:{}", spec.network.bind_address, spec.network.port);
    println!();

    println!("{}", "Session tokens:".bold());
    println!("  Issuer: {}", spec.tokens.issuer);
    println!("  TTL: {}s", spec.tokens.ttl_seconds);
    println!();

    println!("{}", "Observability:".bold());
    println!(
        "  Logging: {} ({})",
        spec.observability.logging.level, spec.observability.logging.format
    );
    if spec.observability.metrics.enabled {
        println!("  Metrics: enabled on port {}", spec.observability.metrics.port);
    } else {
        println!("  Metrics: {}", "disabled".dimmed());
    }
    println!("  Event bus capacity: {}", spec.observability.event_bus_capacity);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = HubConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    std::fs::write(output, sample_config(with_examples))
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

fn sample_config(with_examples: bool) -> &'static str {
    if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    }
}
