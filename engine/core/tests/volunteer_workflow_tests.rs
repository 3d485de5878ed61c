// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the volunteer workflow
//!
//! These tests drive the services end to end over the in-memory store:
//! 1. Apply, approve, remove (role follows the roster)
//! 2. Task assignment gating on approved membership
//! 3. Races on application create and decide
//! 4. Rollback when a step inside a decision fails
//! 5. Notification failures never reach the caller

use async_trait::async_trait;
use std::sync::Arc;

use volunteer_hub_core::application::repository_factory::Repositories;
use volunteer_hub_core::application::volunteer_applications::NewApplication;
use volunteer_hub_core::domain::error::WorkflowError;
use volunteer_hub_core::domain::event::{EventStatus, EventSummary};
use volunteer_hub_core::domain::membership::MembershipStatus;
use volunteer_hub_core::domain::notification::{
    NotificationError, NotificationGateway, NotificationKind, NotificationRequest,
};
use volunteer_hub_core::domain::permission::Actor;
use volunteer_hub_core::domain::repository::{UserLookup, WorkflowStore, WorkflowTransaction};
use volunteer_hub_core::domain::task::{TaskDraft, TaskPatch, WorkStatus};
use volunteer_hub_core::domain::user::{CurrentRole, SystemRole, User, UserId};
use volunteer_hub_core::domain::volunteer_application::{
    ApplicationDecision, ApplicationStatus, VolunteerApplication,
};
use volunteer_hub_core::infrastructure::event_bus::{DomainEvent, EventBus};
use volunteer_hub_core::infrastructure::repositories::InMemoryWorkflowStore;
use volunteer_hub_core::infrastructure::token_issuer::JwtTokenIssuer;
use volunteer_hub_core::presentation::api::AppState;

struct Hub {
    store: Arc<InMemoryWorkflowStore>,
    repos: Repositories,
    event_bus: Arc<EventBus>,
    state: AppState,
}

fn issuer() -> Arc<JwtTokenIssuer> {
    Arc::new(JwtTokenIssuer::new("volunteer-hub-test", "integration-secret", 600))
}

fn hub() -> Hub {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let repos = Repositories::in_memory(store.clone());
    let event_bus = Arc::new(EventBus::new(64));
    let state = AppState::new(repos.clone(), issuer(), event_bus.clone());
    Hub {
        store,
        repos,
        event_bus,
        state,
    }
}

struct DownGateway;

#[async_trait]
impl NotificationGateway for DownGateway {
    async fn notify(&self, _request: NotificationRequest) -> Result<(), NotificationError> {
        Err(NotificationError::Unavailable("mail relay down".to_string()))
    }
}

async fn open_event(store: &InMemoryWorkflowStore, organizer: &User, name: &str) -> EventSummary {
    let mut event = EventSummary::new(organizer.id, name);
    event.status = EventStatus::Published;
    event.accepting_volunteers = true;
    store.insert_event(event).await
}

fn actor(user: &User) -> Actor {
    Actor::new(user.id, user.system_role)
}

fn application_for(event: &EventSummary) -> NewApplication {
    NewApplication {
        event_id: event.id,
        motivation: "I have run registration desks before".to_string(),
        resume_ref: None,
    }
}

async fn notes_of_kind(hub: &Hub, recipient: UserId, kind: NotificationKind) -> usize {
    hub.repos
        .notifications
        .find_by_recipient(recipient, false)
        .await
        .unwrap()
        .iter()
        .filter(|n| n.kind == kind)
        .count()
}

async fn current_role(store: &InMemoryWorkflowStore, id: UserId) -> CurrentRole {
    store.get_user(id).await.unwrap().unwrap().current_role
}

/// Apply and approve in one step; returns the volunteer after approval
async fn approved_volunteer(hub: &Hub, organizer: &User, event: &EventSummary, name: &str) -> User {
    let volunteer = hub
        .store
        .insert_user(User::new(name, format!("{}@example.org", name.to_lowercase()), SystemRole::Standard))
        .await;
    let application = hub
        .state
        .applications
        .create_application(volunteer.id, application_for(event))
        .await
        .unwrap();
    hub.state
        .applications
        .decide_application(application.id, ApplicationDecision::Approve, &actor(organizer))
        .await
        .unwrap();
    volunteer
}

#[tokio::test]
async fn test_apply_approve_remove_round_trip() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = hub
        .store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;

    // Application starts pending
    let application = hub
        .state
        .applications
        .create_application(applicant.id, application_for(&event))
        .await
        .unwrap();
    assert_eq!(application.status, ApplicationStatus::Pending);

    // Approval creates the membership and promotes the applicant
    let decided = hub
        .state
        .applications
        .decide_application(application.id, ApplicationDecision::Approve, &actor(&organizer))
        .await
        .unwrap();
    assert_eq!(decided.status, ApplicationStatus::Approved);
    assert_eq!(decided.processed_by, Some(organizer.id));

    let membership = hub
        .store
        .find_membership(applicant.id, event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.status, MembershipStatus::Approved);
    assert_eq!(current_role(&hub.store, applicant.id).await, CurrentRole::Volunteer);

    let notes = hub.repos.notifications.find_by_recipient(applicant.id, false).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::ApplicationApproved);

    // Removal drops the only approved membership, so the role reverts
    let removed = hub
        .state
        .memberships
        .remove_volunteer(event.id, applicant.id, &actor(&organizer))
        .await
        .unwrap();
    assert_eq!(removed.status, MembershipStatus::Removed);
    assert_eq!(current_role(&hub.store, applicant.id).await, CurrentRole::Attendee);
}

#[tokio::test]
async fn test_removal_leaves_assignments_untouched() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "Food Bank Drive").await;
    let volunteer = approved_volunteer(&hub, &organizer, &event, "Bea").await;

    let task = hub
        .state
        .tasks
        .create_task(
            event.id,
            TaskDraft {
                name: "Sort donations".to_string(),
                ..Default::default()
            },
            &actor(&organizer),
        )
        .await
        .unwrap();
    let assignment = hub
        .state
        .tasks
        .assign_task(task.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();

    hub.state
        .memberships
        .remove_volunteer(event.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();

    let stored = hub.store.find_assignment(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored, assignment);
}

#[tokio::test]
async fn test_unrelated_standard_user_cannot_decide() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = hub
        .store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let bystander = hub
        .store
        .insert_user(User::new("Cal", "cal@example.org", SystemRole::Standard))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;

    let application = hub
        .state
        .applications
        .create_application(applicant.id, application_for(&event))
        .await
        .unwrap();

    let result = hub
        .state
        .applications
        .decide_application(application.id, ApplicationDecision::Approve, &actor(&bystander))
        .await;
    assert!(matches!(result, Err(WorkflowError::PermissionDenied(_))));

    let stored = hub.store.find_application(application.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ApplicationStatus::Pending);
    assert!(hub.store.find_membership(applicant.id, event.id).await.unwrap().is_none());
    assert_eq!(current_role(&hub.store, applicant.id).await, CurrentRole::Attendee);
}

#[tokio::test]
async fn test_elevated_user_can_decide_any_event() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let moderator = hub
        .store
        .insert_user(User::new("Mo", "mo@example.org", SystemRole::Elevated))
        .await;
    let applicant = hub
        .store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;

    let application = hub
        .state
        .applications
        .create_application(applicant.id, application_for(&event))
        .await
        .unwrap();
    let decided = hub
        .state
        .applications
        .decide_application(application.id, ApplicationDecision::Reject, &actor(&moderator))
        .await
        .unwrap();
    assert_eq!(decided.status, ApplicationStatus::Rejected);
    assert_eq!(current_role(&hub.store, applicant.id).await, CurrentRole::Attendee);
}

#[tokio::test]
async fn test_redeciding_is_invalid_state() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = hub
        .store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;

    let application = hub
        .state
        .applications
        .create_application(applicant.id, application_for(&event))
        .await
        .unwrap();
    hub.state
        .applications
        .decide_application(application.id, ApplicationDecision::Reject, &actor(&organizer))
        .await
        .unwrap();

    let again = hub
        .state
        .applications
        .decide_application(application.id, ApplicationDecision::Approve, &actor(&organizer))
        .await;
    assert!(matches!(again, Err(WorkflowError::InvalidState(_))));

    let stored = hub.store.find_application(application.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ApplicationStatus::Rejected);
}

#[tokio::test]
async fn test_role_tracks_approved_membership_count() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let first = open_event(&hub.store, &organizer, "River Cleanup").await;
    let second = open_event(&hub.store, &organizer, "Park Planting").await;
    let volunteer = approved_volunteer(&hub, &organizer, &first, "Dee").await;

    // Approved at the first event, so a fresh application needs an attendee
    hub.state.roles.switch_role(volunteer.id, "ATTENDEE").await.unwrap();
    let application = hub
        .state
        .applications
        .create_application(volunteer.id, application_for(&second))
        .await
        .unwrap();
    hub.state
        .applications
        .decide_application(application.id, ApplicationDecision::Approve, &actor(&organizer))
        .await
        .unwrap();
    assert_eq!(current_role(&hub.store, volunteer.id).await, CurrentRole::Volunteer);

    hub.state
        .memberships
        .remove_volunteer(first.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();
    assert_eq!(current_role(&hub.store, volunteer.id).await, CurrentRole::Volunteer);

    let own = hub
        .state
        .memberships
        .list_my_memberships(&actor(&volunteer), Some(MembershipStatus::Approved))
        .await
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].event_id, second.id);
    let all = hub.state.memberships.list_my_memberships(&actor(&volunteer), None).await.unwrap();
    assert_eq!(all.len(), 2);

    hub.state
        .memberships
        .remove_volunteer(second.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();
    assert_eq!(current_role(&hub.store, volunteer.id).await, CurrentRole::Attendee);

    // Removing twice is rejected and changes nothing
    let again = hub
        .state
        .memberships
        .remove_volunteer(second.id, volunteer.id, &actor(&organizer))
        .await;
    assert!(matches!(again, Err(WorkflowError::InvalidState(_))));
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;
    let volunteer = approved_volunteer(&hub, &organizer, &event, "Eve").await;

    let mut receiver = hub.event_bus.subscribe();
    let once = hub.state.roles.recompute_role(volunteer.id).await.unwrap();
    let twice = hub.state.roles.recompute_role(volunteer.id).await.unwrap();

    assert_eq!(once.current_role, CurrentRole::Volunteer);
    assert_eq!(once, twice);
    // Nothing changed, so nothing was announced
    assert!(receiver.try_recv().is_err());
}

#[tokio::test]
async fn test_switch_to_volunteer_requires_approved_membership() {
    let hub = hub();
    let attendee = hub
        .store
        .insert_user(User::new("Fay", "fay@example.org", SystemRole::Standard))
        .await;

    let denied = hub.state.roles.switch_role(attendee.id, "VOLUNTEER").await;
    assert!(matches!(denied, Err(WorkflowError::PermissionDenied(_))));

    let invalid = hub.state.roles.switch_role(attendee.id, "ADMIN").await;
    assert!(matches!(invalid, Err(WorkflowError::InvalidArgument(_))));

    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;
    let volunteer = approved_volunteer(&hub, &organizer, &event, "Gus").await;

    let switched = hub.state.roles.switch_role(volunteer.id, "attendee").await.unwrap();
    assert_eq!(switched.user.current_role, CurrentRole::Attendee);
    let token = switched.token.expect("token issued");
    let claims = issuer().verify(&token.access_token).unwrap();
    assert_eq!(claims.current_role, "ATTENDEE");

    let back = hub.state.roles.switch_role(volunteer.id, "VOLUNTEER").await.unwrap();
    assert_eq!(back.user.current_role, CurrentRole::Volunteer);
}

#[tokio::test]
async fn test_assignment_requires_approved_membership() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "Food Bank Drive").await;
    let outsider = hub
        .store
        .insert_user(User::new("Hal", "hal@example.org", SystemRole::Standard))
        .await;
    let volunteer = approved_volunteer(&hub, &organizer, &event, "Ivy").await;

    let task = hub
        .state
        .tasks
        .create_task(
            event.id,
            TaskDraft {
                name: "Load the van".to_string(),
                ..Default::default()
            },
            &actor(&organizer),
        )
        .await
        .unwrap();

    let not_member = hub.state.tasks.assign_task(task.id, outsider.id, &actor(&organizer)).await;
    assert!(matches!(not_member, Err(WorkflowError::InvalidState(_))));

    hub.state
        .tasks
        .assign_task(task.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();
    let duplicate = hub.state.tasks.assign_task(task.id, volunteer.id, &actor(&organizer)).await;
    assert!(matches!(duplicate, Err(WorkflowError::Conflict(_))));

    hub.state
        .memberships
        .remove_volunteer(event.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();
    let second_task = hub
        .state
        .tasks
        .create_task(
            event.id,
            TaskDraft {
                name: "Stack chairs".to_string(),
                ..Default::default()
            },
            &actor(&organizer),
        )
        .await
        .unwrap();
    let removed_member = hub
        .state
        .tasks
        .assign_task(second_task.id, volunteer.id, &actor(&organizer))
        .await;
    assert!(matches!(removed_member, Err(WorkflowError::InvalidState(_))));
}

#[tokio::test]
async fn test_volunteer_reports_progress_on_own_assignment() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "Food Bank Drive").await;
    let volunteer = approved_volunteer(&hub, &organizer, &event, "Jo").await;
    let other = approved_volunteer(&hub, &organizer, &event, "Kai").await;

    let task = hub
        .state
        .tasks
        .create_task(
            event.id,
            TaskDraft {
                name: "Greet guests".to_string(),
                ..Default::default()
            },
            &actor(&organizer),
        )
        .await
        .unwrap();
    let assignment = hub
        .state
        .tasks
        .assign_task(task.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();

    let updated = hub
        .state
        .tasks
        .update_assignment(assignment.id, WorkStatus::InProgress, &actor(&volunteer))
        .await
        .unwrap();
    assert_eq!(updated.status, WorkStatus::InProgress);

    let foreign = hub
        .state
        .tasks
        .update_assignment(assignment.id, WorkStatus::Completed, &actor(&other))
        .await;
    assert!(matches!(foreign, Err(WorkflowError::PermissionDenied(_))));

    let mine = hub.state.tasks.list_my_assignments(&actor(&volunteer)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, WorkStatus::InProgress);
}

#[tokio::test]
async fn test_task_update_notifies_assignees_of_visible_changes() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "Food Bank Drive").await;
    let assignee = approved_volunteer(&hub, &organizer, &event, "Jo").await;
    let bystander = approved_volunteer(&hub, &organizer, &event, "Kai").await;

    let task = hub
        .state
        .tasks
        .create_task(
            event.id,
            TaskDraft {
                name: "Sort donations".to_string(),
                ..Default::default()
            },
            &actor(&organizer),
        )
        .await
        .unwrap();
    hub.state
        .tasks
        .assign_task(task.id, assignee.id, &actor(&organizer))
        .await
        .unwrap();

    let silent = [
        TaskPatch {
            category: Some("logistics".to_string()),
            ..Default::default()
        },
        TaskPatch {
            status: Some(WorkStatus::InProgress),
            ..Default::default()
        },
    ];
    for patch in silent {
        hub.state.tasks.update_task(task.id, patch, &actor(&organizer)).await.unwrap();
    }
    assert_eq!(notes_of_kind(&hub, assignee.id, NotificationKind::TaskUpdated).await, 0);

    let visible = [
        TaskPatch {
            name: Some("Sort and shelve donations".to_string()),
            ..Default::default()
        },
        TaskPatch {
            description: Some("Canned goods first".to_string()),
            ..Default::default()
        },
        TaskPatch {
            due_date: Some(Some(chrono::Utc::now() + chrono::Duration::days(3))),
            ..Default::default()
        },
    ];
    for patch in visible {
        hub.state.tasks.update_task(task.id, patch, &actor(&organizer)).await.unwrap();
    }
    assert_eq!(notes_of_kind(&hub, assignee.id, NotificationKind::TaskUpdated).await, 3);
    assert_eq!(notes_of_kind(&hub, bystander.id, NotificationKind::TaskUpdated).await, 0);

    let stored = hub.store.find_task(task.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Sort and shelve donations");
    assert_eq!(stored.category.as_deref(), Some("logistics"));
    assert_eq!(stored.status, WorkStatus::InProgress);
}

#[tokio::test]
async fn test_assignment_status_notifies_organizer_only_for_volunteer_changes() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "Food Bank Drive").await;
    let volunteer = approved_volunteer(&hub, &organizer, &event, "Jo").await;

    let task = hub
        .state
        .tasks
        .create_task(
            event.id,
            TaskDraft {
                name: "Load the van".to_string(),
                ..Default::default()
            },
            &actor(&organizer),
        )
        .await
        .unwrap();
    let assignment = hub
        .state
        .tasks
        .assign_task(task.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();

    hub.state
        .tasks
        .update_assignment(assignment.id, WorkStatus::InProgress, &actor(&volunteer))
        .await
        .unwrap();
    assert_eq!(
        notes_of_kind(&hub, organizer.id, NotificationKind::AssignmentStatusChanged).await,
        1
    );

    // Organizer changes are not echoed back to the organizer
    hub.state
        .tasks
        .update_assignment(assignment.id, WorkStatus::Completed, &actor(&organizer))
        .await
        .unwrap();
    assert_eq!(
        notes_of_kind(&hub, organizer.id, NotificationKind::AssignmentStatusChanged).await,
        1
    );
    assert_eq!(
        notes_of_kind(&hub, volunteer.id, NotificationKind::AssignmentStatusChanged).await,
        0
    );

    // Same status twice is a no-op and stays quiet
    hub.state
        .tasks
        .update_assignment(assignment.id, WorkStatus::Completed, &actor(&volunteer))
        .await
        .unwrap();
    assert_eq!(
        notes_of_kind(&hub, organizer.id, NotificationKind::AssignmentStatusChanged).await,
        1
    );
}

#[tokio::test]
async fn test_deleting_task_removes_its_assignments() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "Food Bank Drive").await;
    let volunteer = approved_volunteer(&hub, &organizer, &event, "Lu").await;

    let task = hub
        .state
        .tasks
        .create_task(
            event.id,
            TaskDraft {
                name: "Sweep the hall".to_string(),
                ..Default::default()
            },
            &actor(&organizer),
        )
        .await
        .unwrap();
    let assignment = hub
        .state
        .tasks
        .assign_task(task.id, volunteer.id, &actor(&organizer))
        .await
        .unwrap();

    let removed = hub.state.tasks.delete_task(task.id, &actor(&organizer)).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert!(hub.store.find_task(task.id).await.unwrap().is_none());
    assert!(hub.store.find_assignment(assignment.id).await.unwrap().is_none());

    let notes = hub.repos.notifications.find_by_recipient(volunteer.id, true).await.unwrap();
    assert!(notes.iter().any(|n| n.kind == NotificationKind::TaskDeleted));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_applications_yield_one_conflict() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = hub
        .store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;

    let applicant_id = applicant.id;
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let service = hub.state.applications.clone();
            let request = application_for(&event);
            tokio::spawn(async move { service.create_application(applicant_id, request).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(WorkflowError::Conflict(_))))
            .count(),
        1
    );
    let stored = hub.store.find_applications_by_event(event.id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decisions_yield_one_winner() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = hub
        .store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;
    let application = hub
        .state
        .applications
        .create_application(applicant.id, application_for(&event))
        .await
        .unwrap();

    let application_id = application.id;
    let decisions = [ApplicationDecision::Approve, ApplicationDecision::Reject];
    let handles: Vec<_> = decisions
        .into_iter()
        .map(|decision| {
            let service = hub.state.applications.clone();
            let organizer = actor(&organizer);
            tokio::spawn(async move { service.decide_application(application_id, decision, &organizer).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(WorkflowError::InvalidState(_))))
            .count(),
        1
    );

    // Stored state agrees with the winning decision
    let stored = hub.store.find_application(application.id).await.unwrap().unwrap();
    assert_eq!(stored.status, winners[0].status);
    let expected_role = if stored.status == ApplicationStatus::Approved {
        CurrentRole::Volunteer
    } else {
        CurrentRole::Attendee
    };
    assert_eq!(current_role(&hub.store, applicant.id).await, expected_role);
}

#[tokio::test]
async fn test_failed_role_write_rolls_back_decision() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let event = open_event(&hub.store, &organizer, "River Cleanup").await;

    // Application from a user the identity service does not know
    let ghost = UserId::new();
    let application = VolunteerApplication::new(ghost, event.id, "Happy to help", None).unwrap();
    let mut tx = hub.store.begin().await.unwrap();
    tx.insert_application(&application).await.unwrap();
    tx.commit().await.unwrap();

    let result = hub
        .state
        .applications
        .decide_application(application.id, ApplicationDecision::Approve, &actor(&organizer))
        .await;
    assert!(matches!(result, Err(WorkflowError::NotFound { .. })));

    let stored = hub.store.find_application(application.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ApplicationStatus::Pending);
    assert!(hub.store.find_membership(ghost, event.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_workflow() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let repos = Repositories::in_memory(store.clone());
    let event_bus = Arc::new(EventBus::new(64));
    let state = AppState::with_gateway(repos, issuer(), Arc::new(DownGateway), event_bus.clone());
    let mut receiver = event_bus.subscribe();

    let organizer = store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let event = open_event(&store, &organizer, "River Cleanup").await;

    let application = state
        .applications
        .create_application(applicant.id, application_for(&event))
        .await
        .unwrap();
    let decided = state
        .applications
        .decide_application(application.id, ApplicationDecision::Approve, &actor(&organizer))
        .await
        .unwrap();

    assert_eq!(decided.status, ApplicationStatus::Approved);
    assert_eq!(current_role(&store, applicant.id).await, CurrentRole::Volunteer);

    // Domain events still flow after commit
    let mut saw_decision = false;
    while let Ok(event) = receiver.try_recv() {
        if matches!(event, DomainEvent::Application(_)) {
            saw_decision = true;
        }
    }
    assert!(saw_decision);
}

#[tokio::test]
async fn test_closed_event_reports_not_found() {
    let hub = hub();
    let organizer = hub
        .store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = hub
        .store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let mut event = EventSummary::new(organizer.id, "Members Only");
    event.status = EventStatus::Published;
    let event = hub.store.insert_event(event).await;

    let result = hub
        .state
        .applications
        .create_application(applicant.id, application_for(&event))
        .await;
    assert!(matches!(result, Err(WorkflowError::NotFound { .. })));

    let own = hub
        .state
        .applications
        .create_application(organizer.id, application_for(&open_event(&hub.store, &organizer, "Open Day").await))
        .await;
    assert!(matches!(own, Err(WorkflowError::PermissionDenied(_))));
}
