// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve workflow aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresWorkflowStore** - Applications, memberships, tasks and
//!   assignments in `sqlx` transactions; reads users and events
//! - **PostgresNotificationRepository** - Notification records
//!
//! ## In-Memory Repositories
//!
//! For development and tests:
//! - **InMemoryWorkflowStore** - Whole-state snapshot per transaction
//! - **InMemoryNotificationRepository** - HashMap-backed records
//!
//! # Design Principles
//!
//! 1. **Technology Agnostic**: Domain layer has no knowledge of persistence
//! 2. **Transactional Consistency**: Nothing written in a transaction is
//!    visible before commit
//! 3. **Error Mapping**: Uniqueness violations surface as `RepositoryError::Conflict`

pub mod postgres_notification;
pub mod postgres_workflow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::event::{EventId, EventSummary};
use crate::domain::membership::{EventVolunteer, MembershipStatus};
use crate::domain::notification::{Notification, NotificationId};
use crate::domain::repository::{
    EventLookup, NotificationRepository, RepositoryError, UserLookup, WorkflowStore, WorkflowTransaction,
};
use crate::domain::task::{AssignmentId, Task, TaskAssignment, TaskId};
use crate::domain::user::{CurrentRole, User, UserId};
use crate::domain::volunteer_application::{ApplicationId, ApplicationStatus, VolunteerApplication};

/// Constraint names shared with the PostgreSQL schema
pub(crate) const APPLICATION_UNIQUE: &str = "volunteer_applications_user_event_key";
pub(crate) const ASSIGNMENT_UNIQUE: &str = "task_assignments_task_volunteer_key";

#[derive(Debug, Clone, Default)]
struct StoreState {
    users: HashMap<UserId, User>,
    events: HashMap<EventId, EventSummary>,
    applications: HashMap<ApplicationId, VolunteerApplication>,
    memberships: HashMap<(UserId, EventId), EventVolunteer>,
    tasks: HashMap<TaskId, Task>,
    assignments: HashMap<AssignmentId, TaskAssignment>,
}

/// In-memory workflow store.
///
/// Transactions are serialized: `begin` takes the store lock and holds it
/// until commit or rollback, so a task holding a transaction must not call
/// other store methods before finishing it.
///
/// `begin` clones the whole state into the staged copy, so every transaction
/// costs O(store size). Meant for development and tests only; use
/// [`postgres_workflow::PostgresWorkflowStore`] for real deployments.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user (identity service stand-in)
    pub async fn insert_user(&self, user: User) -> User {
        self.state.lock().await.users.insert(user.id, user.clone());
        user
    }

    /// Seed an event (events service stand-in)
    pub async fn insert_event(&self, event: EventSummary) -> EventSummary {
        self.state.lock().await.events.insert(event.id, event.clone());
        event
    }
}

#[async_trait]
impl UserLookup for InMemoryWorkflowStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl EventLookup for InMemoryWorkflowStore {
    async fn get_event(&self, id: EventId) -> Result<Option<EventSummary>, RepositoryError> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTransaction>, RepositoryError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, staged }))
    }

    async fn find_application(&self, id: ApplicationId) -> Result<Option<VolunteerApplication>, RepositoryError> {
        Ok(self.state.lock().await.applications.get(&id).cloned())
    }

    async fn find_applications_by_event(&self, event_id: EventId) -> Result<Vec<VolunteerApplication>, RepositoryError> {
        let state = self.state.lock().await;
        let mut applications: Vec<_> = state
            .applications
            .values()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.applied_at.cmp(&b.applied_at));
        Ok(applications)
    }

    async fn find_applications_by_user(&self, user_id: UserId) -> Result<Vec<VolunteerApplication>, RepositoryError> {
        let state = self.state.lock().await;
        let mut applications: Vec<_> = state
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(applications)
    }

    async fn find_membership(&self, user_id: UserId, event_id: EventId) -> Result<Option<EventVolunteer>, RepositoryError> {
        Ok(self.state.lock().await.memberships.get(&(user_id, event_id)).cloned())
    }

    async fn find_memberships_by_event(&self, event_id: EventId) -> Result<Vec<EventVolunteer>, RepositoryError> {
        let state = self.state.lock().await;
        let mut memberships: Vec<_> = state
            .memberships
            .values()
            .filter(|m| m.event_id == event_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(memberships)
    }

    async fn find_memberships_by_user(&self, user_id: UserId) -> Result<Vec<EventVolunteer>, RepositoryError> {
        let state = self.state.lock().await;
        let mut memberships: Vec<_> = state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(memberships)
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.state.lock().await.tasks.get(&id).cloned())
    }

    async fn find_tasks_by_event(&self, event_id: EventId) -> Result<Vec<Task>, RepositoryError> {
        let state = self.state.lock().await;
        let mut tasks: Vec<_> = state
            .tasks
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        // Undated tasks last
        tasks.sort_by(|a, b| {
            (a.due_date.is_none(), a.due_date, a.created_at).cmp(&(b.due_date.is_none(), b.due_date, b.created_at))
        });
        Ok(tasks)
    }

    async fn find_assignment(&self, id: AssignmentId) -> Result<Option<TaskAssignment>, RepositoryError> {
        Ok(self.state.lock().await.assignments.get(&id).cloned())
    }

    async fn find_assignments_by_task(&self, task_id: TaskId) -> Result<Vec<TaskAssignment>, RepositoryError> {
        let state = self.state.lock().await;
        let mut assignments: Vec<_> = state
            .assignments
            .values()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));
        Ok(assignments)
    }

    async fn find_assignments_by_volunteer(&self, volunteer_id: UserId) -> Result<Vec<TaskAssignment>, RepositoryError> {
        let state = self.state.lock().await;
        let mut assignments: Vec<_> = state
            .assignments
            .values()
            .filter(|a| a.volunteer_id == volunteer_id)
            .cloned()
            .collect();
        assignments.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at));
        Ok(assignments)
    }
}

/// Staged copy of the store; swapped in on commit
struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    staged: StoreState,
}

#[async_trait]
impl WorkflowTransaction for InMemoryTransaction {
    async fn get_user_for_update(&mut self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn set_current_role(&mut self, id: UserId, role: CurrentRole) -> Result<(), RepositoryError> {
        let user = self
            .staged
            .users
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("user {}", id)))?;
        user.current_role = role;
        Ok(())
    }

    async fn count_memberships_with_status(
        &mut self,
        user_id: UserId,
        status: MembershipStatus,
    ) -> Result<u64, RepositoryError> {
        Ok(self
            .staged
            .memberships
            .values()
            .filter(|m| m.user_id == user_id && m.status == status)
            .count() as u64)
    }

    async fn insert_application(&mut self, application: &VolunteerApplication) -> Result<(), RepositoryError> {
        let duplicate = self
            .staged
            .applications
            .values()
            .any(|a| a.user_id == application.user_id && a.event_id == application.event_id);
        if duplicate || self.staged.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict(APPLICATION_UNIQUE.to_string()));
        }
        self.staged.applications.insert(application.id, application.clone());
        Ok(())
    }

    async fn transition_application(
        &mut self,
        application: &VolunteerApplication,
        expected: ApplicationStatus,
    ) -> Result<bool, RepositoryError> {
        let stored = self
            .staged
            .applications
            .get_mut(&application.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("application {}", application.id)))?;
        if stored.status != expected {
            return Ok(false);
        }
        *stored = application.clone();
        Ok(true)
    }

    async fn find_membership(&mut self, user_id: UserId, event_id: EventId) -> Result<Option<EventVolunteer>, RepositoryError> {
        Ok(self.staged.memberships.get(&(user_id, event_id)).cloned())
    }

    async fn upsert_membership(&mut self, membership: &EventVolunteer) -> Result<(), RepositoryError> {
        self.staged
            .memberships
            .insert((membership.user_id, membership.event_id), membership.clone());
        Ok(())
    }

    async fn delete_membership(&mut self, user_id: UserId, event_id: EventId) -> Result<bool, RepositoryError> {
        Ok(self.staged.memberships.remove(&(user_id, event_id)).is_some())
    }

    async fn find_task_for_update(&mut self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        Ok(self.staged.tasks.get(&id).cloned())
    }

    async fn insert_task(&mut self, task: &Task) -> Result<(), RepositoryError> {
        if self.staged.tasks.contains_key(&task.id) {
            return Err(RepositoryError::Conflict(format!("task {}", task.id)));
        }
        self.staged.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn update_task(&mut self, task: &Task) -> Result<(), RepositoryError> {
        match self.staged.tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("task {}", task.id))),
        }
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<Vec<TaskAssignment>, RepositoryError> {
        if self.staged.tasks.remove(&id).is_none() {
            return Err(RepositoryError::NotFound(format!("task {}", id)));
        }

        let assignment_ids: Vec<AssignmentId> = self
            .staged
            .assignments
            .values()
            .filter(|a| a.task_id == id)
            .map(|a| a.id)
            .collect();
        let mut removed: Vec<TaskAssignment> = assignment_ids
            .iter()
            .filter_map(|aid| self.staged.assignments.remove(aid))
            .collect();
        removed.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));
        Ok(removed)
    }

    async fn insert_assignment(&mut self, assignment: &TaskAssignment) -> Result<(), RepositoryError> {
        if !self.staged.tasks.contains_key(&assignment.task_id) {
            return Err(RepositoryError::NotFound(format!("task {}", assignment.task_id)));
        }
        let duplicate = self
            .staged
            .assignments
            .values()
            .any(|a| a.task_id == assignment.task_id && a.volunteer_id == assignment.volunteer_id);
        if duplicate || self.staged.assignments.contains_key(&assignment.id) {
            return Err(RepositoryError::Conflict(ASSIGNMENT_UNIQUE.to_string()));
        }
        self.staged.assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn find_assignment_for_update(&mut self, id: AssignmentId) -> Result<Option<TaskAssignment>, RepositoryError> {
        Ok(self.staged.assignments.get(&id).cloned())
    }

    async fn update_assignment(&mut self, assignment: &TaskAssignment) -> Result<(), RepositoryError> {
        match self.staged.assignments.get_mut(&assignment.id) {
            Some(stored) => {
                *stored = assignment.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("assignment {}", assignment.id))),
        }
    }

    async fn delete_assignment(&mut self, id: AssignmentId) -> Result<bool, RepositoryError> {
        Ok(self.staged.assignments.remove(&id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let InMemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationRepository {
    notifications: Arc<RwLock<HashMap<NotificationId, Notification>>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn save(&self, notification: &Notification) -> Result<(), RepositoryError> {
        self.notifications.write().insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Ok(self.notifications.read().get(&id).cloned())
    }

    async fn find_by_recipient(&self, recipient: UserId, unread_only: bool) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.read();
        let mut found: Vec<_> = notifications
            .values()
            .filter(|n| n.recipient == recipient && (!unread_only || !n.read))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn mark_read(&self, id: NotificationId) -> Result<bool, RepositoryError> {
        match self.notifications.write().get_mut(&id) {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
