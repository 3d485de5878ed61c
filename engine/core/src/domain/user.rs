// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # User Identity & Roles
//!
//! A user carries two independent role fields:
//!
//! - [`SystemRole`]: static privilege tier assigned out-of-band
//!   (`STANDARD < ADMIN < ELEVATED`).
//! - [`CurrentRole`]: derived view (`ATTENDEE` / `VOLUNTEER`) kept consistent
//!   with the user's approved event memberships by
//!   `crate::application::role_aggregator`.
//!
//! Users are created by the identity service and never physically deleted;
//! `deleted_at` marks a soft delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::error::WorkflowError;

/// Unique identifier for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static privilege tier of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemRole {
    Standard,
    Admin,
    Elevated,
}

impl SystemRole {
    pub const ALL: [SystemRole; 3] = [Self::Standard, Self::Admin, Self::Elevated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Admin => "ADMIN",
            Self::Elevated => "ELEVATED",
        }
    }
}

impl FromStr for SystemRole {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(Self::Standard),
            "ADMIN" => Ok(Self::Admin),
            "ELEVATED" => Ok(Self::Elevated),
            other => Err(WorkflowError::InvalidArgument(format!(
                "unknown system role '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived, user-facing role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrentRole {
    Attendee,
    Volunteer,
}

impl CurrentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attendee => "ATTENDEE",
            Self::Volunteer => "VOLUNTEER",
        }
    }

    /// The role implied by a count of approved memberships
    pub fn from_approved_count(count: u64) -> Self {
        if count >= 1 {
            Self::Volunteer
        } else {
            Self::Attendee
        }
    }
}

/// Only `ATTENDEE` and `VOLUNTEER` parse; system roles are not switchable.
impl FromStr for CurrentRole {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ATTENDEE" => Ok(Self::Attendee),
            "VOLUNTEER" => Ok(Self::Volunteer),
            other => Err(WorkflowError::InvalidArgument(format!(
                "role '{}' cannot be selected; expected ATTENDEE or VOLUNTEER",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CurrentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    pub system_role: SystemRole,
    pub current_role: CurrentRole,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// New users always start as attendees.
    pub fn new(display_name: impl Into<String>, email: impl Into<String>, system_role: SystemRole) -> Self {
        Self {
            id: UserId::new(),
            display_name: display_name.into(),
            email: email.into(),
            system_role,
            current_role: CurrentRole::Attendee,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
