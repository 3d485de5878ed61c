// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::error::WorkflowError;
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::permission::{Actor, PermissionEngine};
use crate::domain::repository::NotificationRepository;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Recipient-facing access to notification records
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list_notifications(&self, actor: &Actor, unread_only: bool) -> Result<Vec<Notification>, WorkflowError>;

    /// Owner only
    async fn mark_read(&self, id: NotificationId, actor: &Actor) -> Result<Notification, WorkflowError>;
}

pub struct StandardNotificationService {
    repository: Arc<dyn NotificationRepository>,
}

impl StandardNotificationService {
    pub fn new(repository: Arc<dyn NotificationRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl NotificationService for StandardNotificationService {
    async fn list_notifications(&self, actor: &Actor, unread_only: bool) -> Result<Vec<Notification>, WorkflowError> {
        Ok(self.repository.find_by_recipient(actor.id, unread_only).await?)
    }

    async fn mark_read(&self, id: NotificationId, actor: &Actor) -> Result<Notification, WorkflowError> {
        let mut notification = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("notification", id))?;

        if !PermissionEngine::can_act_on_own_resource(actor.id, notification.recipient) {
            return Err(WorkflowError::PermissionDenied(format!(
                "notification {} belongs to another user",
                id
            )));
        }

        if !notification.read {
            if !self.repository.mark_read(id).await? {
                return Err(WorkflowError::not_found("notification", id));
            }
            notification.read = true;
            debug!("Notification {} marked read", id);
        }
        Ok(notification)
    }
}
