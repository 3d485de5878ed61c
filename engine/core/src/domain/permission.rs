// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Permission Engine
//!
//! Stateless authorization predicates for the volunteer workflow. Every
//! decision is a lookup in a (system role × relationship) table; no I/O.
//!
//! | Role \ Relationship | Organizer | Resource owner | Unrelated |
//! |---------------------|-----------|----------------|-----------|
//! | `ELEVATED`          | allow     | allow          | allow     |
//! | `ADMIN`             | allow     | deny           | deny      |
//! | `STANDARD`          | allow     | deny           | deny      |
//!
//! "Resource owner" is the owner of a sub-resource inside the event (for
//! example the volunteer bound to an assignment). Owners get self-service
//! rights through [`PermissionEngine::can_act_on_own_resource`], never
//! event-management rights.

use serde::{Deserialize, Serialize};

use crate::domain::event::EventSummary;
use crate::domain::user::{SystemRole, UserId};

/// Authenticated caller of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: SystemRole,
}

impl Actor {
    pub fn new(id: UserId, role: SystemRole) -> Self {
        Self { id, role }
    }
}

/// How an actor relates to the resource being acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Organizer,
    ResourceOwner,
    Unrelated,
}

/// Which side of the bifurcated assignment rule granted access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentAccess {
    /// Event organizer, or an elevated actor
    Manager,
    /// The volunteer the assignment belongs to
    AssignedVolunteer,
}

pub struct PermissionEngine;

impl PermissionEngine {
    /// Event-management table
    const EVENT_MANAGEMENT: [(SystemRole, Relationship, bool); 9] = [
        (SystemRole::Elevated, Relationship::Organizer, true),
        (SystemRole::Elevated, Relationship::ResourceOwner, true),
        (SystemRole::Elevated, Relationship::Unrelated, true),
        (SystemRole::Admin, Relationship::Organizer, true),
        (SystemRole::Admin, Relationship::ResourceOwner, false),
        (SystemRole::Admin, Relationship::Unrelated, false),
        (SystemRole::Standard, Relationship::Organizer, true),
        (SystemRole::Standard, Relationship::ResourceOwner, false),
        (SystemRole::Standard, Relationship::Unrelated, false),
    ];

    pub fn allows_event_management(role: SystemRole, relationship: Relationship) -> bool {
        Self::EVENT_MANAGEMENT
            .iter()
            .find(|(r, rel, _)| *r == role && *rel == relationship)
            .map(|(_, _, allowed)| *allowed)
            .unwrap_or(false)
    }

    /// Relationship of an actor to an event, with an optional sub-resource owner
    pub fn relationship(actor_id: UserId, event: &EventSummary, resource_owner: Option<UserId>) -> Relationship {
        if event.is_organized_by(actor_id) {
            Relationship::Organizer
        } else if resource_owner == Some(actor_id) {
            Relationship::ResourceOwner
        } else {
            Relationship::Unrelated
        }
    }

    /// True for elevated actors and for the event's organizer
    pub fn can_act_on_event(actor_role: SystemRole, actor_id: UserId, event: &EventSummary) -> bool {
        let relationship = Self::relationship(actor_id, event, None);
        Self::allows_event_management(actor_role, relationship)
    }

    pub fn can_act_on_own_resource(actor_id: UserId, resource_owner_id: UserId) -> bool {
        actor_id == resource_owner_id
    }

    /// Managers first, then the assigned volunteer
    pub fn assignment_access(actor: &Actor, event: &EventSummary, volunteer_id: UserId) -> Option<AssignmentAccess> {
        if Self::can_act_on_event(actor.role, actor.id, event) {
            Some(AssignmentAccess::Manager)
        } else if Self::can_act_on_own_resource(actor.id, volunteer_id) {
            Some(AssignmentAccess::AssignedVolunteer)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_for(organizer: UserId) -> EventSummary {
        EventSummary::new(organizer, "Harbour festival")
    }

    #[test]
    fn test_event_management_matrix() {
        let organizer = UserId::new();
        let owner = UserId::new();
        let event = event_for(organizer);

        let cases = [
            (SystemRole::Elevated, organizer, true),
            (SystemRole::Elevated, owner, true),
            (SystemRole::Elevated, UserId::new(), true),
            (SystemRole::Admin, organizer, true),
            (SystemRole::Admin, owner, false),
            (SystemRole::Admin, UserId::new(), false),
            (SystemRole::Standard, organizer, true),
            (SystemRole::Standard, owner, false),
            (SystemRole::Standard, UserId::new(), false),
        ];

        for (role, actor_id, expected) in cases {
            assert_eq!(
                PermissionEngine::can_act_on_event(role, actor_id, &event),
                expected,
                "role {:?} as {:?}",
                role,
                PermissionEngine::relationship(actor_id, &event, Some(owner))
            );
        }
    }

    #[test]
    fn test_table_covers_every_combination() {
        for role in SystemRole::ALL {
            for rel in [Relationship::Organizer, Relationship::ResourceOwner, Relationship::Unrelated] {
                assert!(
                    PermissionEngine::EVENT_MANAGEMENT
                        .iter()
                        .any(|(r, rl, _)| *r == role && *rl == rel),
                    "missing entry for {:?}/{:?}",
                    role,
                    rel
                );
            }
        }
    }

    #[test]
    fn test_own_resource() {
        let me = UserId::new();
        assert!(PermissionEngine::can_act_on_own_resource(me, me));
        assert!(!PermissionEngine::can_act_on_own_resource(me, UserId::new()));
    }

    #[test]
    fn test_assignment_access_is_bifurcated() {
        let organizer = UserId::new();
        let volunteer = UserId::new();
        let event = event_for(organizer);

        let as_organizer = Actor::new(organizer, SystemRole::Standard);
        let as_volunteer = Actor::new(volunteer, SystemRole::Standard);
        let as_admin_stranger = Actor::new(UserId::new(), SystemRole::Admin);
        let as_elevated = Actor::new(UserId::new(), SystemRole::Elevated);

        assert_eq!(
            PermissionEngine::assignment_access(&as_organizer, &event, volunteer),
            Some(AssignmentAccess::Manager)
        );
        assert_eq!(
            PermissionEngine::assignment_access(&as_volunteer, &event, volunteer),
            Some(AssignmentAccess::AssignedVolunteer)
        );
        assert_eq!(PermissionEngine::assignment_access(&as_admin_stranger, &event, volunteer), None);
        assert_eq!(
            PermissionEngine::assignment_access(&as_elevated, &event, volunteer),
            Some(AssignmentAccess::Manager)
        );
    }
}
