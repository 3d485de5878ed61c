// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task Workflow Service
//!
//! Event-scoped tasks and their volunteer assignments:
//! - Task CRUD for actors authorized on the event
//! - Assignment gated on an APPROVED membership (checked at assignment time only)
//! - Assignment status updates by the assigned volunteer or an event manager
//!
//! Notifications go out after commit and are best-effort.

use crate::application::notifier::Notifier;
use crate::application::unit_of_work::finish;
use crate::domain::error::WorkflowError;
use crate::domain::event::{EventId, EventSummary};
use crate::domain::events::TaskEvent;
use crate::domain::membership::MembershipStatus;
use crate::domain::notification::{NotificationKind, NotificationRequest};
use crate::domain::permission::{Actor, AssignmentAccess, PermissionEngine};
use crate::domain::repository::{EventLookup, WorkflowStore, WorkflowTransaction};
use crate::domain::task::{
    AssignmentId, AssignmentStatus, Task, TaskAssignment, TaskChanges, TaskDraft, TaskId, TaskPatch,
};
use crate::domain::user::UserId;
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait TaskService: Send + Sync {
    async fn create_task(&self, event_id: EventId, draft: TaskDraft, actor: &Actor) -> Result<Task, WorkflowError>;

    /// Apply a partial update. Assigned volunteers are notified when the
    /// name, description or due date changed.
    async fn update_task(&self, task_id: TaskId, patch: TaskPatch, actor: &Actor) -> Result<Task, WorkflowError>;

    /// Delete a task and all of its assignments
    async fn delete_task(&self, task_id: TaskId, actor: &Actor) -> Result<Vec<TaskAssignment>, WorkflowError>;

    async fn assign_task(
        &self,
        task_id: TaskId,
        volunteer_id: UserId,
        actor: &Actor,
    ) -> Result<TaskAssignment, WorkflowError>;

    async fn update_assignment(
        &self,
        assignment_id: AssignmentId,
        status: AssignmentStatus,
        actor: &Actor,
    ) -> Result<TaskAssignment, WorkflowError>;

    async fn remove_assignment(&self, assignment_id: AssignmentId, actor: &Actor) -> Result<(), WorkflowError>;

    async fn get_task(&self, task_id: TaskId, actor: &Actor) -> Result<Task, WorkflowError>;

    async fn list_tasks_for_event(&self, event_id: EventId, actor: &Actor) -> Result<Vec<Task>, WorkflowError>;

    async fn list_assignments_for_task(
        &self,
        task_id: TaskId,
        actor: &Actor,
    ) -> Result<Vec<TaskAssignment>, WorkflowError>;

    async fn list_my_assignments(&self, actor: &Actor) -> Result<Vec<TaskAssignment>, WorkflowError>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardTaskService {
    store: Arc<dyn WorkflowStore>,
    events: Arc<dyn EventLookup>,
    notifier: Notifier,
    event_bus: Arc<EventBus>,
}

impl StandardTaskService {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        events: Arc<dyn EventLookup>,
        notifier: Notifier,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            events,
            notifier,
            event_bus,
        }
    }

    async fn load_event(&self, event_id: EventId) -> Result<EventSummary, WorkflowError> {
        self.events
            .get_event(event_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("event", event_id))
    }

    async fn load_task(&self, task_id: TaskId) -> Result<Task, WorkflowError> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("task", task_id))
    }

    async fn load_assignment(&self, assignment_id: AssignmentId) -> Result<TaskAssignment, WorkflowError> {
        self.store
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("assignment", assignment_id))
    }

    async fn managed_event(&self, event_id: EventId, actor: &Actor) -> Result<EventSummary, WorkflowError> {
        let event = self.load_event(event_id).await?;
        if !PermissionEngine::can_act_on_event(actor.role, actor.id, &event) {
            return Err(WorkflowError::PermissionDenied(format!(
                "user {} cannot manage tasks of event {}",
                actor.id, event_id
            )));
        }
        Ok(event)
    }

    /// Managers, plus volunteers approved for the event, may read its tasks
    async fn readable_event(&self, event_id: EventId, actor: &Actor) -> Result<EventSummary, WorkflowError> {
        let event = self.load_event(event_id).await?;
        if PermissionEngine::can_act_on_event(actor.role, actor.id, &event) {
            return Ok(event);
        }

        let approved = self
            .store
            .find_membership(actor.id, event_id)
            .await?
            .is_some_and(|m| m.is_approved());
        if approved {
            Ok(event)
        } else {
            Err(WorkflowError::PermissionDenied(format!(
                "user {} is not a volunteer of event {}",
                actor.id, event_id
            )))
        }
    }
}

#[async_trait]
impl TaskService for StandardTaskService {
    async fn create_task(&self, event_id: EventId, draft: TaskDraft, actor: &Actor) -> Result<Task, WorkflowError> {
        info!("User {} creating task '{}' for event {}", actor.id, draft.name.trim(), event_id);
        self.managed_event(event_id, actor).await?;

        let task = Task::new(event_id, draft, actor.id)?;

        let mut tx = self.store.begin().await?;
        let result = tx.insert_task(&task).await.map_err(WorkflowError::from);
        finish(tx, result).await?;

        info!("Task {} created for event {}", task.id, event_id);
        self.event_bus.publish_task_event(TaskEvent::TaskCreated {
            task_id: task.id,
            event_id,
            created_by: actor.id,
            created_at: task.created_at,
        });

        Ok(task)
    }

    async fn update_task(&self, task_id: TaskId, patch: TaskPatch, actor: &Actor) -> Result<Task, WorkflowError> {
        let task = self.load_task(task_id).await?;
        self.managed_event(task.event_id, actor).await?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let result = patch_in(tx.as_mut(), task_id, patch, now).await;
        let (task, changes) = finish(tx, result).await?;
        if !changes.any() {
            debug!("Task {} update changed nothing", task_id);
            return Ok(task);
        }

        info!("Task {} updated by {}", task_id, actor.id);
        self.event_bus.publish_task_event(TaskEvent::TaskUpdated {
            task_id,
            event_id: task.event_id,
            updated_at: now,
        });

        if changes.affects_volunteers() {
            match self.store.find_assignments_by_task(task_id).await {
                Ok(assignments) => {
                    let requests = assignments
                        .iter()
                        .map(|a| {
                            NotificationRequest::new(
                                a.volunteer_id,
                                NotificationKind::TaskUpdated,
                                format!("Task '{}' was updated", task.name),
                            )
                            .with_event(task.event_id)
                            .with_task(task_id)
                        })
                        .collect();
                    self.notifier.send_all(requests).await;
                }
                Err(e) => warn!("Task {} updated but assignees could not be loaded: {}", task_id, e),
            }
        }

        Ok(task)
    }

    async fn delete_task(&self, task_id: TaskId, actor: &Actor) -> Result<Vec<TaskAssignment>, WorkflowError> {
        let task = self.load_task(task_id).await?;
        self.managed_event(task.event_id, actor).await?;

        let mut tx = self.store.begin().await?;
        let result = tx.delete_task(task_id).await.map_err(WorkflowError::from);
        let removed = finish(tx, result).await?;

        info!("Task {} deleted with {} assignment(s)", task_id, removed.len());
        self.event_bus.publish_task_event(TaskEvent::TaskDeleted {
            task_id,
            event_id: task.event_id,
            removed_assignments: removed.len(),
            deleted_at: Utc::now(),
        });

        let requests = removed
            .iter()
            .map(|a| {
                NotificationRequest::new(
                    a.volunteer_id,
                    NotificationKind::TaskDeleted,
                    format!("Task '{}' was cancelled", task.name),
                )
                .with_event(task.event_id)
            })
            .collect();
        self.notifier.send_all(requests).await;

        Ok(removed)
    }

    async fn assign_task(
        &self,
        task_id: TaskId,
        volunteer_id: UserId,
        actor: &Actor,
    ) -> Result<TaskAssignment, WorkflowError> {
        info!("User {} assigning task {} to volunteer {}", actor.id, task_id, volunteer_id);
        let task = self.load_task(task_id).await?;
        self.managed_event(task.event_id, actor).await?;

        let assignment = TaskAssignment::new(&task, volunteer_id, actor.id);

        let mut tx = self.store.begin().await?;
        let result = assign_in(tx.as_mut(), &assignment).await;
        finish(tx, result).await?;

        info!("Assignment {} created", assignment.id);
        metrics::counter!("vhub_task_assignments_total").increment(1);
        self.event_bus.publish_task_event(TaskEvent::TaskAssigned {
            assignment_id: assignment.id,
            task_id,
            volunteer_id,
            assigned_by: actor.id,
            assigned_at: assignment.assigned_at,
        });

        self.notifier
            .send(
                NotificationRequest::new(
                    volunteer_id,
                    NotificationKind::TaskAssigned,
                    format!("You were assigned to '{}'", task.name),
                )
                .with_event(task.event_id)
                .with_task(task_id),
            )
            .await;

        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        assignment_id: AssignmentId,
        status: AssignmentStatus,
        actor: &Actor,
    ) -> Result<TaskAssignment, WorkflowError> {
        let assignment = self.load_assignment(assignment_id).await?;
        let event = self.load_event(assignment.event_id).await?;

        let access = PermissionEngine::assignment_access(actor, &event, assignment.volunteer_id).ok_or_else(|| {
            WorkflowError::PermissionDenied(format!(
                "user {} cannot update assignment {}",
                actor.id, assignment_id
            ))
        })?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let result = set_status_in(tx.as_mut(), assignment_id, status, now).await;
        let (assignment, changed) = finish(tx, result).await?;
        if !changed {
            debug!("Assignment {} already {}", assignment_id, status.as_str());
            return Ok(assignment);
        }

        info!("Assignment {} is now {}", assignment_id, status.as_str());
        self.event_bus.publish_task_event(TaskEvent::AssignmentStatusChanged {
            assignment_id,
            task_id: assignment.task_id,
            status,
            changed_by: actor.id,
            changed_at: now,
        });

        if access == AssignmentAccess::AssignedVolunteer {
            self.notifier
                .send(
                    NotificationRequest::new(
                        event.organizer_id,
                        NotificationKind::AssignmentStatusChanged,
                        format!("A volunteer marked their assignment {}", status.as_str()),
                    )
                    .with_event(event.id)
                    .with_task(assignment.task_id),
                )
                .await;
        }

        Ok(assignment)
    }

    async fn remove_assignment(&self, assignment_id: AssignmentId, actor: &Actor) -> Result<(), WorkflowError> {
        let assignment = self.load_assignment(assignment_id).await?;
        self.managed_event(assignment.event_id, actor).await?;

        let mut tx = self.store.begin().await?;
        let result = tx.delete_assignment(assignment_id).await.map_err(WorkflowError::from);
        if !finish(tx, result).await? {
            return Err(WorkflowError::not_found("assignment", assignment_id));
        }

        info!("Assignment {} removed by {}", assignment_id, actor.id);
        self.event_bus.publish_task_event(TaskEvent::AssignmentRemoved {
            assignment_id,
            task_id: assignment.task_id,
            volunteer_id: assignment.volunteer_id,
            removed_at: Utc::now(),
        });

        self.notifier
            .send(
                NotificationRequest::new(
                    assignment.volunteer_id,
                    NotificationKind::AssignmentRemoved,
                    "You were unassigned from a task",
                )
                .with_event(assignment.event_id)
                .with_task(assignment.task_id),
            )
            .await;

        Ok(())
    }

    async fn get_task(&self, task_id: TaskId, actor: &Actor) -> Result<Task, WorkflowError> {
        let task = self.load_task(task_id).await?;
        self.readable_event(task.event_id, actor).await?;
        Ok(task)
    }

    async fn list_tasks_for_event(&self, event_id: EventId, actor: &Actor) -> Result<Vec<Task>, WorkflowError> {
        self.readable_event(event_id, actor).await?;
        Ok(self.store.find_tasks_by_event(event_id).await?)
    }

    async fn list_assignments_for_task(
        &self,
        task_id: TaskId,
        actor: &Actor,
    ) -> Result<Vec<TaskAssignment>, WorkflowError> {
        let task = self.load_task(task_id).await?;
        self.managed_event(task.event_id, actor).await?;
        Ok(self.store.find_assignments_by_task(task_id).await?)
    }

    async fn list_my_assignments(&self, actor: &Actor) -> Result<Vec<TaskAssignment>, WorkflowError> {
        Ok(self.store.find_assignments_by_volunteer(actor.id).await?)
    }
}

/// Re-read the task under lock so concurrent patches apply in turn.
async fn patch_in(
    tx: &mut dyn WorkflowTransaction,
    task_id: TaskId,
    patch: TaskPatch,
    now: DateTime<Utc>,
) -> Result<(Task, TaskChanges), WorkflowError> {
    let mut task = tx
        .find_task_for_update(task_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("task", task_id))?;

    let changes = task.apply(patch, now)?;
    if changes.any() {
        tx.update_task(&task).await?;
    }
    Ok((task, changes))
}

async fn set_status_in(
    tx: &mut dyn WorkflowTransaction,
    assignment_id: AssignmentId,
    status: AssignmentStatus,
    now: DateTime<Utc>,
) -> Result<(TaskAssignment, bool), WorkflowError> {
    let mut assignment = tx
        .find_assignment_for_update(assignment_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("assignment", assignment_id))?;

    let changed = assignment.set_status(status, now)?;
    if changed {
        tx.update_assignment(&assignment).await?;
    }
    Ok((assignment, changed))
}

/// Membership gate and insert run in one transaction.
async fn assign_in(tx: &mut dyn WorkflowTransaction, assignment: &TaskAssignment) -> Result<(), WorkflowError> {
    let approved = tx
        .find_membership(assignment.volunteer_id, assignment.event_id)
        .await?
        .is_some_and(|m| m.status == MembershipStatus::Approved);

    if !approved {
        return Err(WorkflowError::InvalidState(format!(
            "user {} is not an approved volunteer of event {}",
            assignment.volunteer_id, assignment.event_id
        )));
    }

    tx.insert_assignment(assignment).await?;
    Ok(())
}
