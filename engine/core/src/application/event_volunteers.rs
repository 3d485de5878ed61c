// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Event volunteer roster: removal and listing.
//!
//! Removal moves the membership to REMOVED and recomputes the volunteer's
//! role in the same transaction. Task assignments are left untouched.

use crate::application::notifier::Notifier;
use crate::application::role_aggregator::{RoleAggregator, RoleUpdate};
use crate::application::unit_of_work::finish;
use crate::domain::error::WorkflowError;
use crate::domain::event::{EventId, EventSummary};
use crate::domain::events::MembershipEvent;
use crate::domain::membership::{EventVolunteer, MembershipStatus};
use crate::domain::notification::{NotificationKind, NotificationRequest};
use crate::domain::permission::{Actor, PermissionEngine};
use crate::domain::repository::{EventLookup, WorkflowStore, WorkflowTransaction};
use crate::domain::user::UserId;
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait MembershipService: Send + Sync {
    /// Remove a volunteer from an event's roster
    async fn remove_volunteer(
        &self,
        event_id: EventId,
        volunteer_id: UserId,
        actor: &Actor,
    ) -> Result<EventVolunteer, WorkflowError>;

    async fn list_event_volunteers(
        &self,
        event_id: EventId,
        actor: &Actor,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<EventVolunteer>, WorkflowError>;

    /// The acting user's own memberships across events
    async fn list_my_memberships(
        &self,
        actor: &Actor,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<EventVolunteer>, WorkflowError>;
}

pub struct StandardMembershipService {
    store: Arc<dyn WorkflowStore>,
    events: Arc<dyn EventLookup>,
    notifier: Notifier,
    event_bus: Arc<EventBus>,
}

impl StandardMembershipService {
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

    async fn authorized_event(&self, event_id: EventId, actor: &Actor) -> Result<EventSummary, WorkflowError> {
        let event = self
            .events
            .get_event(event_id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("event", event_id))?;

        if !PermissionEngine::can_act_on_event(actor.role, actor.id, &event) {
            return Err(WorkflowError::PermissionDenied(format!(
                "user {} cannot manage volunteers of event {}",
                actor.id, event_id
            )));
        }
        Ok(event)
    }
}

#[async_trait]
impl MembershipService for StandardMembershipService {
    async fn remove_volunteer(
        &self,
        event_id: EventId,
        volunteer_id: UserId,
        actor: &Actor,
    ) -> Result<EventVolunteer, WorkflowError> {
        info!("User {} removing volunteer {} from event {}", actor.id, volunteer_id, event_id);
        let event = self.authorized_event(event_id, actor).await?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let result = remove_in(tx.as_mut(), event_id, volunteer_id, now).await;
        let (membership, role_update) = finish(tx, result).await?;

        info!("Volunteer {} removed from event {}", volunteer_id, event_id);
        metrics::counter!("vhub_volunteers_removed_total").increment(1);

        self.event_bus.publish_membership_event(MembershipEvent::VolunteerRemoved {
            event_id,
            user_id: volunteer_id,
            removed_by: actor.id,
            removed_at: now,
        });
        if let Some(event) = role_update.event() {
            self.event_bus.publish_role_event(event);
        }

        self.notifier
            .send(
                NotificationRequest::new(
                    volunteer_id,
                    NotificationKind::VolunteerRemoved,
                    format!("You are no longer a volunteer at {}", event.name),
                )
                .with_event(event_id),
            )
            .await;

        Ok(membership)
    }

    async fn list_event_volunteers(
        &self,
        event_id: EventId,
        actor: &Actor,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<EventVolunteer>, WorkflowError> {
        self.authorized_event(event_id, actor).await?;

        let mut memberships = self.store.find_memberships_by_event(event_id).await?;
        if let Some(status) = status {
            memberships.retain(|m| m.status == status);
        }
        Ok(memberships)
    }

    async fn list_my_memberships(
        &self,
        actor: &Actor,
        status: Option<MembershipStatus>,
    ) -> Result<Vec<EventVolunteer>, WorkflowError> {
        let mut memberships = self.store.find_memberships_by_user(actor.id).await?;
        if let Some(status) = status {
            memberships.retain(|m| m.status == status);
        }
        Ok(memberships)
    }
}

async fn remove_in(
    tx: &mut dyn WorkflowTransaction,
    event_id: EventId,
    volunteer_id: UserId,
    now: DateTime<Utc>,
) -> Result<(EventVolunteer, RoleUpdate), WorkflowError> {
    let mut membership = tx
        .find_membership(volunteer_id, event_id)
        .await?
        .ok_or_else(|| WorkflowError::not_found("membership", format!("{}/{}", event_id, volunteer_id)))?;

    membership.remove(now)?;
    tx.upsert_membership(&membership).await?;
    let role = RoleAggregator::recompute(tx, volunteer_id).await?;

    Ok((membership, role))
}
