// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server for `vhub serve`

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, info, warn};

use volunteer_hub_core::application::repository_factory::create_repositories;
use volunteer_hub_core::domain::hub_config::HubConfigManifest;
use volunteer_hub_core::infrastructure::event_bus::{EventBus, EventBusError};
use volunteer_hub_core::infrastructure::token_issuer::JwtTokenIssuer;
use volunteer_hub_core::presentation::api::{app, AppState};

/// Load configuration, wire services and serve until Ctrl+C or SIGTERM.
/// `host` and `port` override the configured listen address.
pub async fn start_server(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = HubConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    info!("Configuration loaded: name={}", config.metadata.name);

    let observability = &config.spec.observability;
    if observability.metrics.enabled {
        install_metrics_exporter(&config.spec.network.bind_address, observability.metrics.port)?;
    }

    let backend = config.storage_backend()?;
    let repos = create_repositories(&backend)
        .await
        .context("Failed to initialize repositories")?;

    let secret = config.signing_secret().context("Failed to resolve token signing secret")?;
    let token_issuer = Arc::new(JwtTokenIssuer::new(
        config.spec.tokens.issuer.clone(),
        &secret,
        config.spec.tokens.ttl_seconds,
    ));

    let event_bus = Arc::new(EventBus::new(observability.event_bus_capacity));
    spawn_event_logger(event_bus.clone());

    let state = AppState::new(repos, token_issuer, event_bus);
    let router = app(state);

    let host = host.unwrap_or_else(|| config.spec.network.bind_address.clone());
    let port = port.unwrap_or(config.spec.network.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Volunteer Hub API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Volunteer Hub server stopped");
    Ok(())
}

fn install_metrics_exporter(bind_address: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid metrics listen address {}:{}", bind_address, port))?;

    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics exposed on {}", addr);
    Ok(())
}

/// Log every domain event at debug level
fn spawn_event_logger(event_bus: Arc<EventBus>) {
    let mut receiver = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!("Domain event: {}", json),
                    Err(e) => warn!("Failed to encode domain event: {}", e),
                },
                Err(EventBusError::Lagged(skipped)) => {
                    warn!("Event logger lagged; skipped {} events", skipped)
                }
                Err(_) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
