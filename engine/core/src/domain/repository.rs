// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the volunteer workflow. Interfaces are defined in
//! the domain layer and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Covers | Implementations |
//! |-------|--------|----------------|
//! | `UserLookup` | `User` (read side) | `InMemoryWorkflowStore`, `PostgresWorkflowStore` |
//! | `EventLookup` | `EventSummary` | `InMemoryWorkflowStore`, `PostgresWorkflowStore` |
//! | `WorkflowStore` | applications, memberships, tasks, assignments | `InMemoryWorkflowStore`, `PostgresWorkflowStore` |
//! | `NotificationRepository` | `Notification` | `InMemoryNotificationRepository`, `PostgresNotificationRepository` |
//!
//! ## Transactions
//!
//! Every multi-entity write goes through a [`WorkflowTransaction`] opened with
//! [`WorkflowStore::begin`]. Nothing written through a transaction is visible
//! until [`WorkflowTransaction::commit`]; dropping the transaction (or calling
//! `rollback`) discards all of it.
//!
//! Uniqueness of (user, event) for applications and memberships, and of
//! (task, volunteer) for assignments, is enforced here and reported as
//! [`RepositoryError::Conflict`]. Services never rely on a prior existence
//! check to close that race.

use async_trait::async_trait;

use crate::domain::event::{EventId, EventSummary};
use crate::domain::membership::{EventVolunteer, MembershipStatus};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::task::{AssignmentId, Task, TaskAssignment, TaskId};
use crate::domain::user::{CurrentRole, User, UserId};
use crate::domain::volunteer_application::{ApplicationId, ApplicationStatus, VolunteerApplication};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Read access to users managed by the identity service
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Find user by ID (soft-deleted users included)
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// Read access to events managed by the events service
#[async_trait]
pub trait EventLookup: Send + Sync {
    async fn get_event(&self, id: EventId) -> Result<Option<EventSummary>, RepositoryError>;
}

/// Transactional store for the workflow aggregates
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Open a transaction. The in-memory store serializes transactions, so do
    /// not call other store methods while one is open on the same task.
    async fn begin(&self) -> Result<Box<dyn WorkflowTransaction>, RepositoryError>;

    async fn find_application(&self, id: ApplicationId) -> Result<Option<VolunteerApplication>, RepositoryError>;

    /// Applications for an event, oldest first
    async fn find_applications_by_event(&self, event_id: EventId) -> Result<Vec<VolunteerApplication>, RepositoryError>;

    /// Applications submitted by a user, newest first
    async fn find_applications_by_user(&self, user_id: UserId) -> Result<Vec<VolunteerApplication>, RepositoryError>;

    async fn find_membership(&self, user_id: UserId, event_id: EventId) -> Result<Option<EventVolunteer>, RepositoryError>;

    async fn find_memberships_by_event(&self, event_id: EventId) -> Result<Vec<EventVolunteer>, RepositoryError>;

    async fn find_memberships_by_user(&self, user_id: UserId) -> Result<Vec<EventVolunteer>, RepositoryError>;

    async fn find_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;

    /// Tasks for an event, ordered by due date (undated last)
    async fn find_tasks_by_event(&self, event_id: EventId) -> Result<Vec<Task>, RepositoryError>;

    async fn find_assignment(&self, id: AssignmentId) -> Result<Option<TaskAssignment>, RepositoryError>;

    async fn find_assignments_by_task(&self, task_id: TaskId) -> Result<Vec<TaskAssignment>, RepositoryError>;

    async fn find_assignments_by_volunteer(&self, volunteer_id: UserId) -> Result<Vec<TaskAssignment>, RepositoryError>;
}

/// Unit of work over the workflow aggregates
#[async_trait]
pub trait WorkflowTransaction: Send {
    /// Read a user row, locking it for the rest of the transaction
    async fn get_user_for_update(&mut self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn set_current_role(&mut self, id: UserId, role: CurrentRole) -> Result<(), RepositoryError>;

    async fn count_memberships_with_status(
        &mut self,
        user_id: UserId,
        status: MembershipStatus,
    ) -> Result<u64, RepositoryError>;

    /// Insert a new application; `Conflict` if the (user, event) pair exists
    async fn insert_application(&mut self, application: &VolunteerApplication) -> Result<(), RepositoryError>;

    /// Write a decided application only if the stored status still equals
    /// `expected`. Returns `false` when another writer got there first.
    async fn transition_application(
        &mut self,
        application: &VolunteerApplication,
        expected: ApplicationStatus,
    ) -> Result<bool, RepositoryError>;

    async fn find_membership(&mut self, user_id: UserId, event_id: EventId) -> Result<Option<EventVolunteer>, RepositoryError>;

    /// Insert or replace the record for the membership's (user, event)
    async fn upsert_membership(&mut self, membership: &EventVolunteer) -> Result<(), RepositoryError>;

    /// Returns whether a record existed
    async fn delete_membership(&mut self, user_id: UserId, event_id: EventId) -> Result<bool, RepositoryError>;

    /// Read a task row, locking it for the rest of the transaction
    async fn find_task_for_update(&mut self, id: TaskId) -> Result<Option<Task>, RepositoryError>;

    async fn insert_task(&mut self, task: &Task) -> Result<(), RepositoryError>;

    async fn update_task(&mut self, task: &Task) -> Result<(), RepositoryError>;

    /// Delete a task together with its assignments, returning the removed assignments
    async fn delete_task(&mut self, id: TaskId) -> Result<Vec<TaskAssignment>, RepositoryError>;

    /// Insert a new assignment; `Conflict` if the (task, volunteer) pair exists
    async fn insert_assignment(&mut self, assignment: &TaskAssignment) -> Result<(), RepositoryError>;

    /// Read an assignment row, locking it for the rest of the transaction
    async fn find_assignment_for_update(&mut self, id: AssignmentId) -> Result<Option<TaskAssignment>, RepositoryError>;

    async fn update_assignment(&mut self, assignment: &TaskAssignment) -> Result<(), RepositoryError>;

    /// Returns whether a record existed
    async fn delete_assignment(&mut self, id: AssignmentId) -> Result<bool, RepositoryError>;

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Repository interface for notification records
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn save(&self, notification: &Notification) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError>;

    /// Notifications for a recipient, newest first
    async fn find_by_recipient(&self, recipient: UserId, unread_only: bool) -> Result<Vec<Notification>, RepositoryError>;

    /// Returns whether a record existed
    async fn mark_read(&self, id: NotificationId) -> Result<bool, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return RepositoryError::Conflict(db.constraint().unwrap_or("unique").to_string());
            }
        }
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
