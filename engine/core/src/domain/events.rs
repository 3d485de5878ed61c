// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::EventId;
use crate::domain::notification::{NotificationId, NotificationKind};
use crate::domain::task::{AssignmentId, AssignmentStatus, TaskId};
use crate::domain::user::{CurrentRole, UserId};
use crate::domain::volunteer_application::{ApplicationId, ApplicationStatus};

/// Volunteer application lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApplicationEvent {
    ApplicationSubmitted {
        application_id: ApplicationId,
        event_id: EventId,
        user_id: UserId,
        submitted_at: DateTime<Utc>,
    },
    ApplicationDecided {
        application_id: ApplicationId,
        event_id: EventId,
        user_id: UserId,
        status: ApplicationStatus,
        decided_by: UserId,
        decided_at: DateTime<Utc>,
    },
}

/// Event-volunteer ledger events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MembershipEvent {
    VolunteerApproved {
        event_id: EventId,
        user_id: UserId,
        approved_at: DateTime<Utc>,
    },
    MembershipCleared {
        event_id: EventId,
        user_id: UserId,
        cleared_at: DateTime<Utc>,
    },
    VolunteerRemoved {
        event_id: EventId,
        user_id: UserId,
        removed_by: UserId,
        removed_at: DateTime<Utc>,
    },
}

/// Derived role changes (aggregation or explicit switch)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoleEvent {
    CurrentRoleChanged {
        user_id: UserId,
        from: CurrentRole,
        to: CurrentRole,
        changed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TaskEvent {
    TaskCreated {
        task_id: TaskId,
        event_id: EventId,
        created_by: UserId,
        created_at: DateTime<Utc>,
    },
    TaskUpdated {
        task_id: TaskId,
        event_id: EventId,
        updated_at: DateTime<Utc>,
    },
    TaskDeleted {
        task_id: TaskId,
        event_id: EventId,
        removed_assignments: usize,
        deleted_at: DateTime<Utc>,
    },
    TaskAssigned {
        assignment_id: AssignmentId,
        task_id: TaskId,
        volunteer_id: UserId,
        assigned_by: UserId,
        assigned_at: DateTime<Utc>,
    },
    AssignmentStatusChanged {
        assignment_id: AssignmentId,
        task_id: TaskId,
        status: AssignmentStatus,
        changed_by: UserId,
        changed_at: DateTime<Utc>,
    },
    AssignmentRemoved {
        assignment_id: AssignmentId,
        task_id: TaskId,
        volunteer_id: UserId,
        removed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NotificationEvent {
    NotificationCreated {
        notification_id: NotificationId,
        recipient: UserId,
        kind: NotificationKind,
        created_at: DateTime<Utc>,
    },
}
