// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `vhub migrate`: apply the PostgreSQL schema for the configured backend.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use volunteer_hub_core::domain::hub_config::HubConfigManifest;
use volunteer_hub_core::domain::repository::StorageBackend;
use volunteer_hub_core::infrastructure::db::Database;

pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = HubConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let postgres = match config.storage_backend()? {
        StorageBackend::PostgreSQL(postgres) => postgres,
        StorageBackend::InMemory => {
            println!(
                "{}",
                "Storage backend is memory; nothing to migrate.".yellow()
            );
            return Ok(());
        }
    };

    info!("Connecting to PostgreSQL for migration");
    let db = Database::new(&postgres.connection_string, postgres.max_connections)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.migrate().await.context("Failed to apply schema")?;

    println!("{}", "✓ Schema is up to date".green());
    Ok(())
}
