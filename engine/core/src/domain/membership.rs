// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Event-volunteer membership ledger entry.
//!
//! One record per (user, event), independent of the application that produced
//! it. Records are never hard-deleted by removal; they move to `REMOVED`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::WorkflowError;
use crate::domain::event::EventId;
use crate::domain::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    PendingReview,
    Approved,
    Removed,
}

impl MembershipStatus {
    const TRANSITIONS: [(MembershipStatus, MembershipStatus); 4] = [
        (MembershipStatus::PendingReview, MembershipStatus::Approved),
        (MembershipStatus::PendingReview, MembershipStatus::Removed),
        (MembershipStatus::Approved, MembershipStatus::Removed),
        (MembershipStatus::Removed, MembershipStatus::Approved),
    ];

    pub fn can_transition_to(&self, next: MembershipStatus) -> bool {
        Self::TRANSITIONS.contains(&(*self, next))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "PENDING_REVIEW",
            Self::Approved => "APPROVED",
            Self::Removed => "REMOVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING_REVIEW" => Some(Self::PendingReview),
            "APPROVED" => Some(Self::Approved),
            "REMOVED" => Some(Self::Removed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventVolunteer {
    pub user_id: UserId,
    pub event_id: EventId,
    pub status: MembershipStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventVolunteer {
    pub fn pending_review(user_id: UserId, event_id: EventId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            event_id,
            status: MembershipStatus::PendingReview,
            approved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh approved membership, as written on application approval
    pub fn approved(user_id: UserId, event_id: EventId, now: DateTime<Utc>) -> Self {
        Self {
            status: MembershipStatus::Approved,
            approved_at: Some(now),
            ..Self::pending_review(user_id, event_id, now)
        }
    }

    /// Upsert semantics: approving an already approved record is a no-op.
    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        if self.status == MembershipStatus::Approved {
            return Ok(());
        }
        self.transition(MembershipStatus::Approved, now)?;
        self.approved_at = Some(now);
        Ok(())
    }

    pub fn remove(&mut self, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        self.transition(MembershipStatus::Removed, now)?;
        self.approved_at = None;
        Ok(())
    }

    pub fn is_approved(&self) -> bool {
        self.status == MembershipStatus::Approved
    }

    fn transition(&mut self, next: MembershipStatus, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        if !self.status.can_transition_to(next) {
            return Err(WorkflowError::InvalidState(format!(
                "membership of {} in event {} cannot move from {} to {}",
                self.user_id,
                self.event_id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_clears_approval() {
        let now = Utc::now();
        let mut membership = EventVolunteer::approved(UserId::new(), EventId::new(), now);
        assert!(membership.is_approved());

        membership.remove(now).unwrap();

        assert_eq!(membership.status, MembershipStatus::Removed);
        assert_eq!(membership.approved_at, None);
    }

    #[test]
    fn test_removed_membership_can_be_reapproved() {
        let now = Utc::now();
        let mut membership = EventVolunteer::approved(UserId::new(), EventId::new(), now);
        membership.remove(now).unwrap();

        membership.approve(now).unwrap();

        assert!(membership.is_approved());
        assert_eq!(membership.approved_at, Some(now));
    }

    #[test]
    fn test_double_removal_is_invalid() {
        let now = Utc::now();
        let mut membership = EventVolunteer::approved(UserId::new(), EventId::new(), now);
        membership.remove(now).unwrap();

        let err = membership.remove(now).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState(_)));
    }

    #[test]
    fn test_approve_is_idempotent() {
        let first = Utc::now();
        let mut membership = EventVolunteer::approved(UserId::new(), EventId::new(), first);
        membership.approve(first + chrono::Duration::minutes(5)).unwrap();
        assert_eq!(membership.approved_at, Some(first));
    }
}
