// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that can be
//! injected into all PostgreSQL repository implementations, and carries the
//! schema applied by `vhub migrate`.
//!
//! `users` and `events` belong to the identity and events services; they are
//! declared here with the columns the workflow reads so a standalone
//! deployment can run against one database.
//!
//! `User.current_role` is stored as `active_role`: `current_role` is a
//! reserved word in PostgreSQL.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Idempotent schema for the workflow tables
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id              UUID PRIMARY KEY,
    display_name    TEXT NOT NULL,
    email           TEXT NOT NULL,
    system_role     TEXT NOT NULL DEFAULT 'STANDARD',
    active_role     TEXT NOT NULL DEFAULT 'ATTENDEE',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at      TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS events (
    id                    UUID PRIMARY KEY,
    organizer_id          UUID NOT NULL REFERENCES users(id),
    name                  TEXT NOT NULL,
    status                TEXT NOT NULL DEFAULT 'DRAFT',
    accepting_volunteers  BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS volunteer_applications (
    id              UUID PRIMARY KEY,
    user_id         UUID NOT NULL REFERENCES users(id),
    event_id        UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    motivation      TEXT NOT NULL,
    resume_ref      TEXT,
    status          TEXT NOT NULL DEFAULT 'PENDING',
    applied_at      TIMESTAMPTZ NOT NULL,
    processed_at    TIMESTAMPTZ,
    processed_by    UUID,
    CONSTRAINT volunteer_applications_user_event_key UNIQUE (user_id, event_id)
);

CREATE TABLE IF NOT EXISTS event_volunteers (
    user_id         UUID NOT NULL REFERENCES users(id),
    event_id        UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    status          TEXT NOT NULL,
    approved_at     TIMESTAMPTZ,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (user_id, event_id)
);

CREATE INDEX IF NOT EXISTS event_volunteers_user_status_idx
    ON event_volunteers (user_id, status);

CREATE TABLE IF NOT EXISTS tasks (
    id              UUID PRIMARY KEY,
    event_id        UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    name            TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    category        TEXT,
    due_date        TIMESTAMPTZ,
    status          TEXT NOT NULL DEFAULT 'PENDING',
    created_by      UUID NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS task_assignments (
    id              UUID PRIMARY KEY,
    task_id         UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    event_id        UUID NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    volunteer_id    UUID NOT NULL REFERENCES users(id),
    status          TEXT NOT NULL DEFAULT 'PENDING',
    assigned_at     TIMESTAMPTZ NOT NULL,
    assigned_by     UUID NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL,
    CONSTRAINT task_assignments_task_volunteer_key UNIQUE (task_id, volunteer_id)
);

CREATE TABLE IF NOT EXISTS notifications (
    id                      UUID PRIMARY KEY,
    recipient               UUID NOT NULL,
    kind                    TEXT NOT NULL,
    message                 TEXT NOT NULL,
    related_event_id        UUID,
    related_task_id         UUID,
    related_application_id  UUID,
    created_at              TIMESTAMPTZ NOT NULL,
    read                    BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE INDEX IF NOT EXISTS notifications_recipient_idx
    ON notifications (recipient, created_at DESC);
"#;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply [`SCHEMA`]. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to apply workflow schema")?;
        info!("Workflow schema applied");
        Ok(())
    }
}
