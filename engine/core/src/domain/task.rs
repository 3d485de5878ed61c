// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tasks & Assignments
//!
//! A [`Task`] is an event-scoped unit of work. A [`TaskAssignment`] binds one
//! approved volunteer to one task and carries its own progress status,
//! independent of the task's status.
//!
//! Both status machines allow every move between distinct values: progress
//! reporting is not forced to be forward-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::domain::error::WorkflowError;
use crate::domain::event::EventId;
use crate::domain::user::UserId;

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub Uuid);

impl AssignmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress status shared by tasks and assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkStatus {
    Pending,
    InProgress,
    Completed,
}

impl WorkStatus {
    const TRANSITIONS: [(WorkStatus, WorkStatus); 6] = [
        (WorkStatus::Pending, WorkStatus::InProgress),
        (WorkStatus::Pending, WorkStatus::Completed),
        (WorkStatus::InProgress, WorkStatus::Pending),
        (WorkStatus::InProgress, WorkStatus::Completed),
        (WorkStatus::Completed, WorkStatus::Pending),
        (WorkStatus::Completed, WorkStatus::InProgress),
    ];

    pub fn can_transition_to(&self, next: WorkStatus) -> bool {
        Self::TRANSITIONS.contains(&(*self, next))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

pub type TaskStatus = WorkStatus;
pub type AssignmentStatus = WorkStatus;

/// Input for task creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// `Some(None)` (a JSON `null`) clears the due date
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

/// Keeps an explicit `null` apart from an absent field
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// What a patch actually changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub name: bool,
    pub description: bool,
    pub category: bool,
    pub due_date: bool,
    pub status: bool,
}

impl TaskChanges {
    /// Changes assigned volunteers are told about
    pub fn affects_volunteers(&self) -> bool {
        self.name || self.description || self.due_date
    }

    pub fn any(&self) -> bool {
        self.affects_volunteers() || self.category || self.status
    }
}

// ============================================================================
// Aggregate Root: Task
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub event_id: EventId,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(event_id: EventId, draft: TaskDraft, created_by: UserId) -> Result<Self, WorkflowError> {
        let name = validate_name(&draft.name)?;
        let now = Utc::now();
        Ok(Self {
            id: TaskId::new(),
            event_id,
            name,
            description: draft.description,
            category: normalize_category(draft.category),
            due_date: draft.due_date,
            status: TaskStatus::Pending,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a patch, validating every field before mutating anything.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) -> Result<TaskChanges, WorkflowError> {
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        if let Some(status) = patch.status {
            if status != self.status && !self.status.can_transition_to(status) {
                return Err(WorkflowError::InvalidState(format!(
                    "task {} cannot move from {} to {}",
                    self.id,
                    self.status.as_str(),
                    status.as_str()
                )));
            }
        }

        let mut changes = TaskChanges::default();

        if let Some(name) = name {
            if name != self.name {
                self.name = name;
                changes.name = true;
            }
        }
        if let Some(description) = patch.description {
            if description != self.description {
                self.description = description;
                changes.description = true;
            }
        }
        if patch.category.is_some() {
            let category = normalize_category(patch.category);
            if category != self.category {
                self.category = category;
                changes.category = true;
            }
        }
        if let Some(due_date) = patch.due_date {
            if due_date != self.due_date {
                self.due_date = due_date;
                changes.due_date = true;
            }
        }
        if let Some(status) = patch.status {
            if status != self.status {
                self.status = status;
                changes.status = true;
            }
        }

        if changes.any() {
            self.updated_at = now;
        }
        Ok(changes)
    }
}

fn validate_name(name: &str) -> Result<String, WorkflowError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::InvalidArgument("task name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

// ============================================================================
// Entity: TaskAssignment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub id: AssignmentId,
    pub task_id: TaskId,
    /// Denormalized from the task so authorization needs no task read
    pub event_id: EventId,
    pub volunteer_id: UserId,
    pub status: AssignmentStatus,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: UserId,
    pub updated_at: DateTime<Utc>,
}

impl TaskAssignment {
    pub fn new(task: &Task, volunteer_id: UserId, assigned_by: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: AssignmentId::new(),
            task_id: task.id,
            event_id: task.event_id,
            volunteer_id,
            status: AssignmentStatus::Pending,
            assigned_at: now,
            assigned_by,
            updated_at: now,
        }
    }

    /// Returns whether the status changed.
    pub fn set_status(&mut self, status: AssignmentStatus, now: DateTime<Utc>) -> Result<bool, WorkflowError> {
        if status == self.status {
            return Ok(false);
        }
        if !self.status.can_transition_to(status) {
            return Err(WorkflowError::InvalidState(format!(
                "assignment {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                status.as_str()
            )));
        }
        self.status = status;
        self.updated_at = now;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task() -> Task {
        Task::new(
            EventId::new(),
            TaskDraft {
                name: "Set up chairs".to_string(),
                description: "Main hall, 200 chairs".to_string(),
                category: Some("logistics".to_string()),
                due_date: None,
            },
            UserId::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_every_distinct_status_move_is_allowed() {
        use WorkStatus::*;
        for from in [Pending, InProgress, Completed] {
            for to in [Pending, InProgress, Completed] {
                assert_eq!(from.can_transition_to(to), from != to);
            }
        }
    }

    #[test]
    fn test_new_task_trims_and_validates_name() {
        let task = Task::new(
            EventId::new(),
            TaskDraft {
                name: "  Greet guests ".to_string(),
                ..Default::default()
            },
            UserId::new(),
        )
        .unwrap();
        assert_eq!(task.name, "Greet guests");
        assert_eq!(task.status, WorkStatus::Pending);

        let err = Task::new(EventId::new(), TaskDraft::default(), UserId::new()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument(_)));
    }

    #[test]
    fn test_patch_reports_volunteer_relevant_changes() {
        let mut task = task();
        let changes = task
            .apply(
                TaskPatch {
                    category: Some("setup".to_string()),
                    status: Some(WorkStatus::InProgress),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(changes.category && changes.status);
        assert!(!changes.affects_volunteers());

        let due = Utc::now() + Duration::days(2);
        let changes = task
            .apply(
                TaskPatch {
                    due_date: Some(Some(due)),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        assert!(changes.affects_volunteers());
        assert_eq!(task.due_date, Some(due));
    }

    #[test]
    fn test_null_due_date_clears_and_absent_keeps() {
        let mut task = task();
        task.due_date = Some(Utc::now() + Duration::days(1));

        let absent: TaskPatch = serde_json::from_str(r#"{"name": "Stack chairs"}"#).unwrap();
        assert_eq!(absent.due_date, None);
        let changes = task.apply(absent, Utc::now()).unwrap();
        assert!(!changes.due_date);
        assert!(task.due_date.is_some());

        let cleared: TaskPatch = serde_json::from_str(r#"{"due_date": null}"#).unwrap();
        assert_eq!(cleared.due_date, Some(None));
        let changes = task.apply(cleared, Utc::now()).unwrap();
        assert!(changes.due_date && changes.affects_volunteers());
        assert_eq!(task.due_date, None);
    }

    #[test]
    fn test_patch_with_same_values_changes_nothing() {
        let mut task = task();
        let before = task.clone();
        let changes = task
            .apply(
                TaskPatch {
                    name: Some(before.name.clone()),
                    description: Some(before.description.clone()),
                    status: Some(before.status),
                    ..Default::default()
                },
                Utc::now() + Duration::hours(1),
            )
            .unwrap();
        assert!(!changes.any());
        assert_eq!(task, before);
    }

    #[test]
    fn test_invalid_patch_leaves_task_untouched() {
        let mut task = task();
        let before = task.clone();
        let err = task
            .apply(
                TaskPatch {
                    name: Some("".to_string()),
                    description: Some("changed".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument(_)));
        assert_eq!(task, before);
    }

    #[test]
    fn test_assignment_status_can_move_backwards() {
        let task = task();
        let mut assignment = TaskAssignment::new(&task, UserId::new(), task.created_by);
        assert!(assignment.set_status(WorkStatus::Completed, Utc::now()).unwrap());
        assert!(assignment.set_status(WorkStatus::Pending, Utc::now()).unwrap());
        assert!(!assignment.set_status(WorkStatus::Pending, Utc::now()).unwrap());
    }
}
