// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on the storage backend
//! selected in the hub configuration. Keeps the domain layer free of
//! infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Selects in-memory or PostgreSQL repositories

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::domain::repository::{
    EventLookup, NotificationRepository, StorageBackend, UserLookup, WorkflowStore,
};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::postgres_notification::PostgresNotificationRepository;
use crate::infrastructure::repositories::postgres_workflow::PostgresWorkflowStore;
use crate::infrastructure::repositories::{InMemoryNotificationRepository, InMemoryWorkflowStore};

/// Every repository the services need, bound to one backend
#[derive(Clone)]
pub struct Repositories {
    pub store: Arc<dyn WorkflowStore>,
    pub users: Arc<dyn UserLookup>,
    pub events: Arc<dyn EventLookup>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    /// In-memory repositories around an existing store (tests, demos)
    pub fn in_memory(store: Arc<InMemoryWorkflowStore>) -> Self {
        Self {
            store: store.clone(),
            users: store.clone(),
            events: store,
            notifications: Arc::new(InMemoryNotificationRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PostgresWorkflowStore::new(pool.clone()));
        Self {
            store: store.clone(),
            users: store.clone(),
            events: store,
            notifications: Arc::new(PostgresNotificationRepository::new(pool)),
        }
    }
}

/// Creates the repository set for the configured backend, connecting to
/// PostgreSQL when selected.
pub async fn create_repositories(backend: &StorageBackend) -> anyhow::Result<Repositories> {
    match backend {
        StorageBackend::InMemory => Ok(Repositories::in_memory(Arc::new(InMemoryWorkflowStore::new()))),
        StorageBackend::PostgreSQL(config) => {
            let db = Database::new(&config.connection_string, config.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            Ok(Repositories::postgres(db.get_pool().clone()))
        }
    }
}
