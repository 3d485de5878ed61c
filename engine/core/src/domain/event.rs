// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Community event, as seen by the volunteer workflow.
//!
//! Event CRUD lives in the events service; the engine only reads the fields it
//! needs through `EventLookup`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;

/// Unique identifier for a community event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Publication status of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Draft,
    Published,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "PUBLISHED" => Some(Self::Published),
            "CANCELLED" => Some(Self::Cancelled),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub organizer_id: UserId,
    pub name: String,
    pub status: EventStatus,
    pub accepting_volunteers: bool,
}

impl EventSummary {
    pub fn new(organizer_id: UserId, name: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            organizer_id,
            name: name.into(),
            status: EventStatus::Draft,
            accepting_volunteers: false,
        }
    }

    /// Published and flagged as accepting volunteers
    pub fn is_open_for_applications(&self) -> bool {
        self.status == EventStatus::Published && self.accepting_volunteers
    }

    pub fn is_organized_by(&self, user_id: UserId) -> bool {
        self.organizer_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_published_accepting_events_take_applications() {
        let mut event = EventSummary::new(UserId::new(), "Park cleanup");
        assert!(!event.is_open_for_applications());

        event.status = EventStatus::Published;
        assert!(!event.is_open_for_applications());

        event.accepting_volunteers = true;
        assert!(event.is_open_for_applications());

        event.status = EventStatus::Cancelled;
        assert!(!event.is_open_for_applications());
    }
}
