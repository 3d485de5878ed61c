// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::event::EventId;
use crate::domain::notification::{Notification, NotificationId, NotificationKind};
use crate::domain::repository::{NotificationRepository, RepositoryError};
use crate::domain::task::TaskId;
use crate::domain::user::UserId;
use crate::domain::volunteer_application::ApplicationId;

pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn save(&self, notification: &Notification) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient, kind, message, related_event_id,
                related_task_id, related_application_id, created_at, read
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET read = EXCLUDED.read
            "#,
        )
        .bind(notification.id.0)
        .bind(notification.recipient.0)
        .bind(notification.kind.as_str())
        .bind(&notification.message)
        .bind(notification.related_event_id.map(|id| id.0))
        .bind(notification.related_task_id.map(|id| id.0))
        .bind(notification.related_application_id.map(|id| id.0))
        .bind(notification.created_at)
        .bind(notification.read)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save notification: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, recipient, kind, message, related_event_id,
                   related_task_id, related_application_id, created_at, read
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(parse_notification_row).transpose()
    }

    async fn find_by_recipient(&self, recipient: UserId, unread_only: bool) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, recipient, kind, message, related_event_id,
                   related_task_id, related_application_id, created_at, read
            FROM notifications
            WHERE recipient = $1 AND (NOT $2 OR read = FALSE)
            ORDER BY created_at DESC
            "#,
        )
        .bind(recipient.0)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(parse_notification_row).collect()
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn parse_notification_row(row: PgRow) -> Result<Notification, RepositoryError> {
    let kind: String = row.try_get("kind")?;
    let kind = NotificationKind::parse(&kind)
        .ok_or_else(|| RepositoryError::Serialization(format!("Unknown notification kind '{}'", kind)))?;
    let related_event_id: Option<Uuid> = row.try_get("related_event_id")?;
    let related_task_id: Option<Uuid> = row.try_get("related_task_id")?;
    let related_application_id: Option<Uuid> = row.try_get("related_application_id")?;

    Ok(Notification {
        id: NotificationId(row.try_get("id")?),
        recipient: UserId(row.try_get("recipient")?),
        kind,
        message: row.try_get("message")?,
        related_event_id: related_event_id.map(EventId),
        related_task_id: related_task_id.map(TaskId),
        related_application_id: related_application_id.map(ApplicationId),
        created_at: row.try_get("created_at")?,
        read: row.try_get("read")?,
    })
}
