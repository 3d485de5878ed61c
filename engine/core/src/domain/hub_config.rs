// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Hub Configuration Types
//
// Defines the configuration schema for a volunteer hub node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Storage backend selection (in-memory or PostgreSQL)
// - HTTP listener settings
// - Session token signing for role switches
// - Logging and metrics settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "volunteer-hub/v1";
pub const KIND: &str = "HubConfig";

/// Top-level Kubernetes-style hub configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfigManifest {
    /// API version (must be "volunteer-hub/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "HubConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: HubConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfigSpec {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub tokens: TokenConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_kind")]
    pub backend: StorageKind,

    /// PostgreSQL connection string (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_kind(),
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// `iss` claim of issued session tokens
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// HMAC signing secret (supports "env:VAR_NAME")
    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,

    #[serde(default = "default_token_ttl")]
    pub ttl_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            signing_secret: default_signing_secret(),
            ttl_seconds: default_token_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Buffered domain events before slow subscribers start lagging
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable the Prometheus exporter
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

// Default value functions
fn default_storage_kind() -> StorageKind {
    StorageKind::Memory
}

fn default_max_connections() -> u32 {
    5
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_issuer() -> String {
    "volunteer-hub".to_string()
}

fn default_signing_secret() -> String {
    "env:VHUB_TOKEN_SECRET".to_string()
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for HubConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "volunteer-hub".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: HubConfigSpec::default(),
        }
    }
}

/// Resolve a value that may reference an environment variable ("env:NAME")
pub fn resolve_secret_ref(value: &str, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    match value.strip_prefix("env:") {
        Some(var) => lookup(var).ok_or_else(|| anyhow::anyhow!("Environment variable {} is not set", var)),
        None => Ok(value.to_string()),
    }
}

impl HubConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. VHUB_CONFIG_PATH environment variable
    /// 2. ./vhub-config.yaml (working directory)
    /// 3. ~/.vhub/config.yaml (user home)
    /// 4. /etc/vhub/config.yaml (system, Unix) or C:\ProgramData\VolunteerHub\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("VHUB_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./vhub-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".vhub").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/vhub/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\VolunteerHub\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("VHUB_STORAGE_BACKEND") {
            match val.to_lowercase().as_str() {
                "memory" => {
                    tracing::info!("Environment override: VHUB_STORAGE_BACKEND=memory");
                    self.spec.storage.backend = StorageKind::Memory;
                }
                "postgres" | "postgresql" => {
                    tracing::info!("Environment override: VHUB_STORAGE_BACKEND=postgres");
                    self.spec.storage.backend = StorageKind::Postgres;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for VHUB_STORAGE_BACKEND: '{}'. Expected memory/postgres. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Some(url) = lookup("VHUB_DATABASE_URL") {
            tracing::info!("Environment override: VHUB_DATABASE_URL");
            self.spec.storage.database_url = Some(url);
        }

        if let Some(secret) = lookup("VHUB_TOKEN_SECRET") {
            // Only replace literal secrets; "env:" references already resolve to it
            if !self.spec.tokens.signing_secret.starts_with("env:") {
                tracing::info!("Environment override: VHUB_TOKEN_SECRET");
                self.spec.tokens.signing_secret = secret;
            }
        }
    }

    /// Map the storage section onto the repository backend selector
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.spec.storage.backend {
            StorageKind::Memory => Ok(StorageBackend::InMemory),
            StorageKind::Postgres => {
                let url = self
                    .spec
                    .storage
                    .database_url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("spec.storage.database_url is required for postgres"))?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: resolve_secret_ref(url, |v| std::env::var(v).ok())?,
                    max_connections: self.spec.storage.max_connections,
                }))
            }
        }
    }

    pub fn signing_secret(&self) -> anyhow::Result<String> {
        resolve_secret_ref(&self.spec.tokens.signing_secret, |v| std::env::var(v).ok())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let storage = &self.spec.storage;
        if storage.backend == StorageKind::Postgres {
            match storage.database_url.as_deref() {
                None | Some("") => anyhow::bail!("spec.storage.database_url is required when backend is postgres"),
                _ => {}
            }
            if storage.max_connections == 0 {
                anyhow::bail!("spec.storage.max_connections must be greater than zero");
            }
        }

        if self.spec.tokens.signing_secret.trim().is_empty() || self.spec.tokens.signing_secret == "env:" {
            anyhow::bail!("spec.tokens.signing_secret cannot be empty");
        }

        if self.spec.tokens.ttl_seconds == 0 {
            anyhow::bail!("spec.tokens.ttl_seconds must be greater than zero");
        }

        match self.spec.observability.logging.format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("Invalid logging format '{}'. Expected json or text", other),
        }

        if self.spec.observability.event_bus_capacity == 0 {
            anyhow::bail!("spec.observability.event_bus_capacity must be greater than zero");
        }

        Ok(())
    }
}
