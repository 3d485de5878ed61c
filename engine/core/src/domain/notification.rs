// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Notification records and the gateway contract.
//!
//! The workflow only creates notification records; delivery (mail, push) is
//! handled outside the engine. Gateway calls are best-effort: callers log a
//! failure and carry on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::event::EventId;
use crate::domain::task::TaskId;
use crate::domain::user::UserId;
use crate::domain::volunteer_application::ApplicationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationSubmitted,
    ApplicationApproved,
    ApplicationRejected,
    VolunteerRemoved,
    TaskAssigned,
    TaskUpdated,
    TaskDeleted,
    AssignmentStatusChanged,
    AssignmentRemoved,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationSubmitted => "application_submitted",
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationRejected => "application_rejected",
            Self::VolunteerRemoved => "volunteer_removed",
            Self::TaskAssigned => "task_assigned",
            Self::TaskUpdated => "task_updated",
            Self::TaskDeleted => "task_deleted",
            Self::AssignmentStatusChanged => "assignment_status_changed",
            Self::AssignmentRemoved => "assignment_removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "application_submitted" => Some(Self::ApplicationSubmitted),
            "application_approved" => Some(Self::ApplicationApproved),
            "application_rejected" => Some(Self::ApplicationRejected),
            "volunteer_removed" => Some(Self::VolunteerRemoved),
            "task_assigned" => Some(Self::TaskAssigned),
            "task_updated" => Some(Self::TaskUpdated),
            "task_deleted" => Some(Self::TaskDeleted),
            "assignment_status_changed" => Some(Self::AssignmentStatusChanged),
            "assignment_removed" => Some(Self::AssignmentRemoved),
            _ => None,
        }
    }
}

/// A request to notify one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub related_event_id: Option<EventId>,
    pub related_task_id: Option<TaskId>,
    pub related_application_id: Option<ApplicationId>,
}

impl NotificationRequest {
    pub fn new(recipient: UserId, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient,
            kind,
            message: message.into(),
            related_event_id: None,
            related_task_id: None,
            related_application_id: None,
        }
    }

    pub fn with_event(mut self, event_id: EventId) -> Self {
        self.related_event_id = Some(event_id);
        self
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        self.related_task_id = Some(task_id);
        self
    }

    pub fn with_application(mut self, application_id: ApplicationId) -> Self {
        self.related_application_id = Some(application_id);
        self
    }
}

/// Persisted notification record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub message: String,
    pub related_event_id: Option<EventId>,
    pub related_task_id: Option<TaskId>,
    pub related_application_id: Option<ApplicationId>,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn from_request(request: NotificationRequest) -> Self {
        Self {
            id: NotificationId::new(),
            recipient: request.recipient,
            kind: request.kind,
            message: request.message,
            related_event_id: request.related_event_id,
            related_task_id: request.related_task_id,
            related_application_id: request.related_application_id,
            created_at: Utc::now(),
            read: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification storage failed: {0}")]
    Storage(String),

    #[error("Notification gateway unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification port
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify(&self, request: NotificationRequest) -> Result<(), NotificationError>;
}
