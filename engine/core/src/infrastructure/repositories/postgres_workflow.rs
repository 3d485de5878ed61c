// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Workflow Store
//!
//! `sqlx` implementation of the workflow store. Each workflow transaction is
//! one `sqlx::Transaction`; the user row touched by a role write is locked
//! with `SELECT ... FOR UPDATE`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Persist applications, memberships, tasks and assignments

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::event::{EventId, EventStatus, EventSummary};
use crate::domain::membership::{EventVolunteer, MembershipStatus};
use crate::domain::repository::{EventLookup, RepositoryError, UserLookup, WorkflowStore, WorkflowTransaction};
use crate::domain::task::{AssignmentId, Task, TaskAssignment, TaskId, WorkStatus};
use crate::domain::user::{CurrentRole, SystemRole, User, UserId};
use crate::domain::volunteer_application::{ApplicationId, ApplicationStatus, VolunteerApplication};

const USER_COLUMNS: &str = "id, display_name, email, system_role, active_role, created_at, deleted_at";
const APPLICATION_COLUMNS: &str =
    "id, user_id, event_id, motivation, resume_ref, status, applied_at, processed_at, processed_by";
const MEMBERSHIP_COLUMNS: &str = "user_id, event_id, status, approved_at, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, event_id, name, description, category, due_date, status, created_by, created_at, updated_at";
const ASSIGNMENT_COLUMNS: &str =
    "id, task_id, event_id, volunteer_id, status, assigned_at, assigned_by, updated_at";

pub struct PostgresWorkflowStore {
    pool: PgPool,
}

impl PostgresWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PostgresWorkflowStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(parse_user_row).transpose()
    }
}

#[async_trait]
impl EventLookup for PostgresWorkflowStore {
    async fn get_event(&self, id: EventId) -> Result<Option<EventSummary>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, organizer_id, name, status, accepting_volunteers
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(parse_event_row).transpose()
    }
}

#[async_trait]
impl WorkflowStore for PostgresWorkflowStore {
    async fn begin(&self) -> Result<Box<dyn WorkflowTransaction>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresWorkflowTransaction { tx }))
    }

    async fn find_application(&self, id: ApplicationId) -> Result<Option<VolunteerApplication>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM volunteer_applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(parse_application_row).transpose()
    }

    async fn find_applications_by_event(&self, event_id: EventId) -> Result<Vec<VolunteerApplication>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM volunteer_applications WHERE event_id = $1 ORDER BY applied_at ASC",
            APPLICATION_COLUMNS
        ))
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_application_row).collect()
    }

    async fn find_applications_by_user(&self, user_id: UserId) -> Result<Vec<VolunteerApplication>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM volunteer_applications WHERE user_id = $1 ORDER BY applied_at DESC",
            APPLICATION_COLUMNS
        ))
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_application_row).collect()
    }

    async fn find_membership(&self, user_id: UserId, event_id: EventId) -> Result<Option<EventVolunteer>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM event_volunteers WHERE user_id = $1 AND event_id = $2",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id.0)
        .bind(event_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(parse_membership_row).transpose()
    }

    async fn find_memberships_by_event(&self, event_id: EventId) -> Result<Vec<EventVolunteer>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM event_volunteers WHERE event_id = $1 ORDER BY created_at ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_membership_row).collect()
    }

    async fn find_memberships_by_user(&self, user_id: UserId) -> Result<Vec<EventVolunteer>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM event_volunteers WHERE user_id = $1 ORDER BY created_at ASC",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_membership_row).collect()
    }

    async fn find_task(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(parse_task_row).transpose()
    }

    async fn find_tasks_by_event(&self, event_id: EventId) -> Result<Vec<Task>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tasks WHERE event_id = $1 ORDER BY due_date ASC NULLS LAST, created_at ASC",
            TASK_COLUMNS
        ))
        .bind(event_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_task_row).collect()
    }

    async fn find_assignment(&self, id: AssignmentId) -> Result<Option<TaskAssignment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM task_assignments WHERE id = $1",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(parse_assignment_row).transpose()
    }

    async fn find_assignments_by_task(&self, task_id: TaskId) -> Result<Vec<TaskAssignment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM task_assignments WHERE task_id = $1 ORDER BY assigned_at ASC",
            ASSIGNMENT_COLUMNS
        ))
        .bind(task_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_assignment_row).collect()
    }

    async fn find_assignments_by_volunteer(&self, volunteer_id: UserId) -> Result<Vec<TaskAssignment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM task_assignments WHERE volunteer_id = $1 ORDER BY assigned_at DESC",
            ASSIGNMENT_COLUMNS
        ))
        .bind(volunteer_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(parse_assignment_row).collect()
    }
}

pub struct PostgresWorkflowTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl WorkflowTransaction for PostgresWorkflowTransaction {
    async fn get_user_for_update(&mut self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS))
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(parse_user_row).transpose()
    }

    async fn set_current_role(&mut self, id: UserId, role: CurrentRole) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET active_role = $2 WHERE id = $1")
            .bind(id.0)
            .bind(role.as_str())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn count_memberships_with_status(
        &mut self,
        user_id: UserId,
        status: MembershipStatus,
    ) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_volunteers WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id.0)
        .bind(status.as_str())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count as u64)
    }

    async fn insert_application(&mut self, application: &VolunteerApplication) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO volunteer_applications (
                id, user_id, event_id, motivation, resume_ref, status,
                applied_at, processed_at, processed_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(application.id.0)
        .bind(application.user_id.0)
        .bind(application.event_id.0)
        .bind(&application.motivation)
        .bind(&application.resume_ref)
        .bind(application.status.as_str())
        .bind(application.applied_at)
        .bind(application.processed_at)
        .bind(application.processed_by.map(|u| u.0))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn transition_application(
        &mut self,
        application: &VolunteerApplication,
        expected: ApplicationStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE volunteer_applications
            SET status = $2, processed_at = $3, processed_by = $4
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(application.id.0)
        .bind(application.status.as_str())
        .bind(application.processed_at)
        .bind(application.processed_by.map(|u| u.0))
        .bind(expected.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_membership(&mut self, user_id: UserId, event_id: EventId) -> Result<Option<EventVolunteer>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM event_volunteers WHERE user_id = $1 AND event_id = $2 FOR UPDATE",
            MEMBERSHIP_COLUMNS
        ))
        .bind(user_id.0)
        .bind(event_id.0)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(parse_membership_row).transpose()
    }

    async fn upsert_membership(&mut self, membership: &EventVolunteer) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO event_volunteers (user_id, event_id, status, approved_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, event_id) DO UPDATE SET
                status = EXCLUDED.status,
                approved_at = EXCLUDED.approved_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(membership.user_id.0)
        .bind(membership.event_id.0)
        .bind(membership.status.as_str())
        .bind(membership.approved_at)
        .bind(membership.created_at)
        .bind(membership.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_membership(&mut self, user_id: UserId, event_id: EventId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM event_volunteers WHERE user_id = $1 AND event_id = $2")
            .bind(user_id.0)
            .bind(event_id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_task_for_update(&mut self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM tasks WHERE id = $1 FOR UPDATE", TASK_COLUMNS))
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(parse_task_row).transpose()
    }

    async fn insert_task(&mut self, task: &Task) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, event_id, name, description, category, due_date,
                status, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(task.id.0)
        .bind(task.event_id.0)
        .bind(&task.name)
        .bind(&task.description)
        .bind(&task.category)
        .bind(task.due_date)
        .bind(task.status.as_str())
        .bind(task.created_by.0)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_task(&mut self, task: &Task) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET name = $2, description = $3, category = $4, due_date = $5,
                status = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(task.id.0)
        .bind(&task.name)
        .bind(&task.description)
        .bind(&task.category)
        .bind(task.due_date)
        .bind(task.status.as_str())
        .bind(task.updated_at)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("task {}", task.id)));
        }
        Ok(())
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<Vec<TaskAssignment>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "DELETE FROM task_assignments WHERE task_id = $1 RETURNING {}",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id.0)
        .fetch_all(&mut *self.tx)
        .await?;
        let mut removed = rows
            .into_iter()
            .map(parse_assignment_row)
            .collect::<Result<Vec<_>, _>>()?;
        removed.sort_by(|a, b| a.assigned_at.cmp(&b.assigned_at));

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("task {}", id)));
        }
        Ok(removed)
    }

    async fn insert_assignment(&mut self, assignment: &TaskAssignment) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO task_assignments (
                id, task_id, event_id, volunteer_id, status,
                assigned_at, assigned_by, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(assignment.id.0)
        .bind(assignment.task_id.0)
        .bind(assignment.event_id.0)
        .bind(assignment.volunteer_id.0)
        .bind(assignment.status.as_str())
        .bind(assignment.assigned_at)
        .bind(assignment.assigned_by.0)
        .bind(assignment.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_assignment_for_update(&mut self, id: AssignmentId) -> Result<Option<TaskAssignment>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM task_assignments WHERE id = $1 FOR UPDATE",
            ASSIGNMENT_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(parse_assignment_row).transpose()
    }

    async fn update_assignment(&mut self, assignment: &TaskAssignment) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE task_assignments SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(assignment.id.0)
            .bind(assignment.status.as_str())
            .bind(assignment.updated_at)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("assignment {}", assignment.id)));
        }
        Ok(())
    }

    async fn delete_assignment(&mut self, id: AssignmentId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM task_assignments WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let PostgresWorkflowTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        let PostgresWorkflowTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

fn parse_status<T>(row: &PgRow, column: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T, RepositoryError> {
    let raw: String = row.try_get(column)?;
    parse(&raw).ok_or_else(|| RepositoryError::Serialization(format!("Unknown {} value '{}'", column, raw)))
}

fn parse_user_row(row: PgRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        display_name: row.try_get("display_name")?,
        email: row.try_get("email")?,
        system_role: parse_status(&row, "system_role", |s| s.parse::<SystemRole>().ok())?,
        current_role: parse_status(&row, "active_role", |s| s.parse::<CurrentRole>().ok())?,
        created_at: row.try_get("created_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn parse_event_row(row: PgRow) -> Result<EventSummary, RepositoryError> {
    Ok(EventSummary {
        id: EventId(row.try_get("id")?),
        organizer_id: UserId(row.try_get("organizer_id")?),
        name: row.try_get("name")?,
        status: parse_status(&row, "status", EventStatus::parse)?,
        accepting_volunteers: row.try_get("accepting_volunteers")?,
    })
}

fn parse_application_row(row: PgRow) -> Result<VolunteerApplication, RepositoryError> {
    let processed_by: Option<Uuid> = row.try_get("processed_by")?;
    Ok(VolunteerApplication {
        id: ApplicationId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        event_id: EventId(row.try_get("event_id")?),
        motivation: row.try_get("motivation")?,
        resume_ref: row.try_get("resume_ref")?,
        status: parse_status(&row, "status", ApplicationStatus::parse)?,
        applied_at: row.try_get("applied_at")?,
        processed_at: row.try_get("processed_at")?,
        processed_by: processed_by.map(UserId),
    })
}

fn parse_membership_row(row: PgRow) -> Result<EventVolunteer, RepositoryError> {
    Ok(EventVolunteer {
        user_id: UserId(row.try_get("user_id")?),
        event_id: EventId(row.try_get("event_id")?),
        status: parse_status(&row, "status", MembershipStatus::parse)?,
        approved_at: row.try_get("approved_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn parse_task_row(row: PgRow) -> Result<Task, RepositoryError> {
    let due_date: Option<DateTime<Utc>> = row.try_get("due_date")?;
    Ok(Task {
        id: TaskId(row.try_get("id")?),
        event_id: EventId(row.try_get("event_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        due_date,
        status: parse_status(&row, "status", WorkStatus::parse)?,
        created_by: UserId(row.try_get("created_by")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn parse_assignment_row(row: PgRow) -> Result<TaskAssignment, RepositoryError> {
    Ok(TaskAssignment {
        id: AssignmentId(row.try_get("id")?),
        task_id: TaskId(row.try_get("task_id")?),
        event_id: EventId(row.try_get("event_id")?),
        volunteer_id: UserId(row.try_get("volunteer_id")?),
        status: parse_status(&row, "status", WorkStatus::parse)?,
        assigned_at: row.try_get("assigned_at")?,
        assigned_by: UserId(row.try_get("assigned_by")?),
        updated_at: row.try_get("updated_at")?,
    })
}
