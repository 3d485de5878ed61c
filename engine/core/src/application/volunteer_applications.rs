// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Volunteer Application Service
//!
//! Onboarding entry point. Coordinates:
//! - Domain layer: `VolunteerApplication` aggregate, `PermissionEngine`
//! - Membership ledger and role aggregation inside one transaction on decision
//! - Event bus: `ApplicationEvent`, `MembershipEvent`, `RoleEvent`
//! - Notifier: organizer on submission, applicant on decision (after commit)

use crate::application::notifier::Notifier;
use crate::application::role_aggregator::{RoleAggregator, RoleUpdate};
use crate::application::unit_of_work::finish;
use crate::domain::error::WorkflowError;
use crate::domain::event::{EventId, EventSummary};
use crate::domain::events::{ApplicationEvent, MembershipEvent};
use crate::domain::membership::EventVolunteer;
use crate::domain::notification::{NotificationKind, NotificationRequest};
use crate::domain::permission::{Actor, PermissionEngine};
use crate::domain::repository::{EventLookup, UserLookup, WorkflowStore, WorkflowTransaction};
use crate::domain::user::{CurrentRole, User, UserId};
use crate::domain::volunteer_application::{
    ApplicationDecision, ApplicationId, ApplicationStatus, VolunteerApplication,
};
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub event_id: EventId,
    pub motivation: String,
    pub resume_ref: Option<String>,
}

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait ApplicationService: Send + Sync {
    /// Submit a PENDING application for the applicant
    async fn create_application(
        &self,
        applicant_id: UserId,
        request: NewApplication,
    ) -> Result<VolunteerApplication, WorkflowError>;

    /// Approve or reject a pending application
    async fn decide_application(
        &self,
        application_id: ApplicationId,
        decision: ApplicationDecision,
        actor: &Actor,
    ) -> Result<VolunteerApplication, WorkflowError>;

    async fn get_application(
        &self,
        application_id: ApplicationId,
        actor: &Actor,
    ) -> Result<VolunteerApplication, WorkflowError>;

    async fn list_applications_for_event(
        &self,
        event_id: EventId,
        actor: &Actor,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<VolunteerApplication>, WorkflowError>;

    async fn list_my_applications(&self, actor: &Actor) -> Result<Vec<VolunteerApplication>, WorkflowError>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardApplicationService {
    store: Arc<dyn WorkflowStore>,
    users: Arc<dyn UserLookup>,
    events: Arc<dyn EventLookup>,
    notifier: Notifier,
    event_bus: Arc<EventBus>,
}

impl StandardApplicationService {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        users: Arc<dyn UserLookup>,
        events: Arc<dyn EventLookup>,
        notifier: Notifier,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            users,
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

    async fn load_application(&self, id: ApplicationId) -> Result<VolunteerApplication, WorkflowError> {
        self.store
            .find_application(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("application", id))
    }

    fn authorize_event(actor: &Actor, event: &EventSummary) -> Result<(), WorkflowError> {
        if PermissionEngine::can_act_on_event(actor.role, actor.id, event) {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied(format!(
                "user {} cannot manage event {}",
                actor.id, event.id
            )))
        }
    }
}

#[async_trait]
impl ApplicationService for StandardApplicationService {
    async fn create_application(
        &self,
        applicant_id: UserId,
        request: NewApplication,
    ) -> Result<VolunteerApplication, WorkflowError> {
        info!("User {} applying to volunteer at event {}", applicant_id, request.event_id);

        let applicant = self
            .users
            .get_user(applicant_id)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| WorkflowError::not_found("user", applicant_id))?;

        if applicant.current_role != CurrentRole::Attendee {
            return Err(WorkflowError::PermissionDenied(format!(
                "only attendees can apply; user {} is {}",
                applicant_id, applicant.current_role
            )));
        }

        // Unpublished or closed events are indistinguishable from missing ones
        let event = self
            .events
            .get_event(request.event_id)
            .await?
            .filter(EventSummary::is_open_for_applications)
            .ok_or_else(|| WorkflowError::not_found("event", request.event_id))?;

        if event.is_organized_by(applicant_id) {
            return Err(WorkflowError::PermissionDenied(
                "organizers cannot volunteer at their own event".to_string(),
            ));
        }

        let application =
            VolunteerApplication::new(applicant_id, event.id, request.motivation, request.resume_ref)?;

        let mut tx = self.store.begin().await?;
        let result = tx.insert_application(&application).await.map_err(WorkflowError::from);
        finish(tx, result).await?;

        info!("Application {} submitted for event {}", application.id, event.id);
        metrics::counter!("vhub_applications_submitted_total").increment(1);
        self.event_bus
            .publish_application_event(ApplicationEvent::ApplicationSubmitted {
                application_id: application.id,
                event_id: event.id,
                user_id: applicant_id,
                submitted_at: application.applied_at,
            });

        self.notifier
            .send(
                NotificationRequest::new(
                    event.organizer_id,
                    NotificationKind::ApplicationSubmitted,
                    format!("{} applied to volunteer at {}", applicant.display_name, event.name),
                )
                .with_event(event.id)
                .with_application(application.id),
            )
            .await;

        Ok(application)
    }

    async fn decide_application(
        &self,
        application_id: ApplicationId,
        decision: ApplicationDecision,
        actor: &Actor,
    ) -> Result<VolunteerApplication, WorkflowError> {
        info!("User {} deciding application {}: {:?}", actor.id, application_id, decision);

        let mut application = self.load_application(application_id).await?;
        let event = self.load_event(application.event_id).await?;
        Self::authorize_event(actor, &event)?;

        let now = Utc::now();
        application.decide(decision, actor.id, now)?;

        let mut tx = self.store.begin().await?;
        let result = apply_decision(tx.as_mut(), &application, decision, now).await;
        let (membership_event, role_update) = finish(tx, result).await?;

        info!(
            "Application {} {} by {}",
            application.id,
            application.status.as_str(),
            actor.id
        );
        metrics::counter!("vhub_applications_decided_total", "decision" => application.status.as_str())
            .increment(1);

        self.event_bus
            .publish_application_event(ApplicationEvent::ApplicationDecided {
                application_id: application.id,
                event_id: application.event_id,
                user_id: application.user_id,
                status: application.status,
                decided_by: actor.id,
                decided_at: now,
            });
        if let Some(event) = membership_event {
            self.event_bus.publish_membership_event(event);
        }
        if let Some(event) = role_update.event() {
            self.event_bus.publish_role_event(event);
        }

        let (kind, message) = match decision {
            ApplicationDecision::Approve => (
                NotificationKind::ApplicationApproved,
                format!("Your application to volunteer at {} was approved", event.name),
            ),
            ApplicationDecision::Reject => (
                NotificationKind::ApplicationRejected,
                format!("Your application to volunteer at {} was not accepted", event.name),
            ),
        };
        self.notifier
            .send(
                NotificationRequest::new(application.user_id, kind, message)
                    .with_event(event.id)
                    .with_application(application.id),
            )
            .await;

        Ok(application)
    }

    async fn get_application(
        &self,
        application_id: ApplicationId,
        actor: &Actor,
    ) -> Result<VolunteerApplication, WorkflowError> {
        let application = self.load_application(application_id).await?;
        if PermissionEngine::can_act_on_own_resource(actor.id, application.user_id) {
            return Ok(application);
        }

        let event = self.load_event(application.event_id).await?;
        Self::authorize_event(actor, &event)?;
        Ok(application)
    }

    async fn list_applications_for_event(
        &self,
        event_id: EventId,
        actor: &Actor,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<VolunteerApplication>, WorkflowError> {
        let event = self.load_event(event_id).await?;
        Self::authorize_event(actor, &event)?;

        let mut applications = self.store.find_applications_by_event(event_id).await?;
        if let Some(status) = status {
            applications.retain(|a| a.status == status);
        }
        debug!("Listed {} applications for event {}", applications.len(), event_id);
        Ok(applications)
    }

    async fn list_my_applications(&self, actor: &Actor) -> Result<Vec<VolunteerApplication>, WorkflowError> {
        Ok(self.store.find_applications_by_user(actor.id).await?)
    }
}

/// Transactional half of a decision: guarded status write, ledger update and
/// role write.
async fn apply_decision(
    tx: &mut dyn WorkflowTransaction,
    application: &VolunteerApplication,
    decision: ApplicationDecision,
    now: DateTime<Utc>,
) -> Result<(Option<MembershipEvent>, RoleUpdate), WorkflowError> {
    if !tx
        .transition_application(application, ApplicationStatus::Pending)
        .await?
    {
        return Err(WorkflowError::InvalidState(format!(
            "application {} was decided concurrently",
            application.id
        )));
    }

    let user_id = application.user_id;
    let event_id = application.event_id;

    match decision {
        ApplicationDecision::Approve => {
            let membership = match tx.find_membership(user_id, event_id).await? {
                Some(mut existing) => {
                    existing.approve(now)?;
                    existing
                }
                None => EventVolunteer::approved(user_id, event_id, now),
            };
            tx.upsert_membership(&membership).await?;
            let role = RoleAggregator::set_volunteer(tx, user_id).await?;

            Ok((
                Some(MembershipEvent::VolunteerApproved {
                    event_id,
                    user_id,
                    approved_at: now,
                }),
                role,
            ))
        }
        ApplicationDecision::Reject => {
            let existed = tx.delete_membership(user_id, event_id).await?;
            let role = RoleAggregator::recompute(tx, user_id).await?;

            let cleared = existed.then_some(MembershipEvent::MembershipCleared {
                event_id,
                user_id,
                cleared_at: now,
            });
            Ok((cleared, role))
        }
    }
}
