// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::WorkflowError;
use crate::domain::event::EventId;
use crate::domain::user::UserId;

// ============================================================================
// Value Objects
// ============================================================================

/// Unique identifier for a volunteer application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application status lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Allowed transitions. Decided applications are never re-opened.
    const TRANSITIONS: [(ApplicationStatus, ApplicationStatus); 2] = [
        (ApplicationStatus::Pending, ApplicationStatus::Approved),
        (ApplicationStatus::Pending, ApplicationStatus::Rejected),
    ];

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        Self::TRANSITIONS.contains(&(*self, next))
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Organizer decision on a pending application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationDecision {
    Approve,
    Reject,
}

impl ApplicationDecision {
    pub fn target_status(&self) -> ApplicationStatus {
        match self {
            Self::Approve => ApplicationStatus::Approved,
            Self::Reject => ApplicationStatus::Rejected,
        }
    }
}

// ============================================================================
// Aggregate Root: VolunteerApplication
// ============================================================================

/// Request by a user to volunteer at one event. Unique per (user, event).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerApplication {
    pub id: ApplicationId,
    pub user_id: UserId,
    pub event_id: EventId,
    pub motivation: String,
    /// Reference into the file store (CV / resume upload)
    pub resume_ref: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<UserId>,
}

impl VolunteerApplication {
    pub fn new(
        user_id: UserId,
        event_id: EventId,
        motivation: impl Into<String>,
        resume_ref: Option<String>,
    ) -> Result<Self, WorkflowError> {
        let motivation = motivation.into();
        if motivation.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "motivation cannot be empty".to_string(),
            ));
        }

        let resume_ref = resume_ref.filter(|r| !r.trim().is_empty());

        Ok(Self {
            id: ApplicationId::new(),
            user_id,
            event_id,
            motivation,
            resume_ref,
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
            processed_at: None,
            processed_by: None,
        })
    }

    /// Apply an organizer decision. Only a pending application can be decided.
    pub fn decide(
        &mut self,
        decision: ApplicationDecision,
        decided_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let target = decision.target_status();
        if !self.status.can_transition_to(target) {
            return Err(WorkflowError::InvalidState(format!(
                "application {} is already {} and cannot be {}",
                self.id,
                self.status.as_str(),
                target.as_str()
            )));
        }
        self.status = target;
        self.processed_at = Some(now);
        self.processed_by = Some(decided_by);
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Pending
    }
}
