// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API (`/api/v1`)
//!
//! Thin axum handlers over the workflow services. Authentication happens
//! upstream; the gateway forwards the caller as `X-Actor-Id` and
//! `X-Actor-Role` headers.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::application::event_volunteers::{MembershipService, StandardMembershipService};
use crate::application::notifications::{NotificationService, StandardNotificationService};
use crate::application::notifier::Notifier;
use crate::application::repository_factory::Repositories;
use crate::application::role_aggregator::{RoleService, StandardRoleService};
use crate::application::task_workflow::{StandardTaskService, TaskService};
use crate::application::volunteer_applications::{
    ApplicationService, NewApplication, StandardApplicationService,
};
use crate::domain::error::WorkflowError;
use crate::domain::event::EventId;
use crate::domain::membership::MembershipStatus;
use crate::domain::notification::{NotificationGateway, NotificationId};
use crate::domain::permission::Actor;
use crate::domain::task::{AssignmentId, TaskDraft, TaskId, TaskPatch, WorkStatus};
use crate::domain::token::TokenIssuer;
use crate::domain::user::{SystemRole, UserId};
use crate::domain::volunteer_application::{ApplicationDecision, ApplicationId, ApplicationStatus};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::notifications::RecordingNotificationGateway;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Clone)]
pub struct AppState {
    pub applications: Arc<dyn ApplicationService>,
    pub memberships: Arc<dyn MembershipService>,
    pub tasks: Arc<dyn TaskService>,
    pub roles: Arc<dyn RoleService>,
    pub notifications: Arc<dyn NotificationService>,
    pub event_bus: Arc<EventBus>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire every service over one repository set. Notifications are
    /// recorded through the repository set's notification store.
    pub fn new(repos: Repositories, token_issuer: Arc<dyn TokenIssuer>, event_bus: Arc<EventBus>) -> Self {
        let gateway: Arc<dyn NotificationGateway> = Arc::new(RecordingNotificationGateway::new(
            repos.notifications.clone(),
            event_bus.clone(),
        ));
        Self::with_gateway(repos, token_issuer, gateway, event_bus)
    }

    pub fn with_gateway(
        repos: Repositories,
        token_issuer: Arc<dyn TokenIssuer>,
        gateway: Arc<dyn NotificationGateway>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let notifier = Notifier::new(gateway);

        Self {
            applications: Arc::new(StandardApplicationService::new(
                repos.store.clone(),
                repos.users.clone(),
                repos.events.clone(),
                notifier.clone(),
                event_bus.clone(),
            )),
            memberships: Arc::new(StandardMembershipService::new(
                repos.store.clone(),
                repos.events.clone(),
                notifier.clone(),
                event_bus.clone(),
            )),
            tasks: Arc::new(StandardTaskService::new(
                repos.store.clone(),
                repos.events.clone(),
                notifier,
                event_bus.clone(),
            )),
            roles: Arc::new(StandardRoleService::new(
                repos.store.clone(),
                repos.users.clone(),
                token_issuer,
                event_bus.clone(),
            )),
            notifications: Arc::new(StandardNotificationService::new(repos.notifications)),
            event_bus,
            start_time: Instant::now(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/applications", post(create_application))
        .route("/applications/mine", get(list_my_applications))
        .route("/applications/{id}", get(get_application))
        .route("/applications/{id}/decision", post(decide_application))
        .route("/events/{event_id}/applications", get(list_event_applications))
        .route("/events/{event_id}/volunteers", get(list_event_volunteers))
        .route(
            "/events/{event_id}/volunteers/{user_id}",
            delete(remove_volunteer),
        )
        .route("/events/{event_id}/tasks", post(create_task).get(list_event_tasks))
        .route("/tasks/{id}", get(get_task).patch(update_task).delete(delete_task))
        .route("/tasks/{id}/assignments", post(assign_task).get(list_task_assignments))
        .route("/assignments/mine", get(list_my_assignments))
        .route(
            "/assignments/{id}",
            patch(update_assignment).delete(remove_assignment),
        )
        .route("/me", get(get_me))
        .route("/me/memberships", get(list_my_memberships))
        .route("/me/role", post(switch_role))
        .route("/me/role/recompute", post(recompute_role))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_notification_read));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Workflow(WorkflowError),
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Workflow(err) => match err {
                WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
                WorkflowError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                WorkflowError::Conflict(_) => StatusCode::CONFLICT,
                WorkflowError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
                WorkflowError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                WorkflowError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (kind, message) = match &self {
            ApiError::Unauthorized(msg) => ("unauthorized", msg.clone()),
            ApiError::Workflow(err) => (err.kind(), err.to_string()),
        };
        if status.is_server_error() {
            error!("Request failed: {}", message);
        }
        (status, Json(json!({ "error": { "kind": kind, "message": message } }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .map_err(|_| WorkflowError::InvalidArgument(format!("invalid {} id '{}'", what, raw)).into())
}

// ============================================================================
// Actor extraction
// ============================================================================

/// Caller identity forwarded by the authenticating gateway
pub struct AuthenticatedActor(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))
        };

        let id = header(ACTOR_ID_HEADER)?;
        let role = header(ACTOR_ROLE_HEADER)?;

        let id = UserId::from_string(&id).map_err(|_| ApiError::Unauthorized("invalid actor id".to_string()))?;
        let role: SystemRole = role
            .parse()
            .map_err(|_| ApiError::Unauthorized("invalid actor role".to_string()))?;

        Ok(AuthenticatedActor(Actor::new(id, role)))
    }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub event_id: String,
    pub motivation: String,
    #[serde(default)]
    pub resume_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: ApplicationDecision,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    pub volunteer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssignmentRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchRoleRequest {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn create_application(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(body): Json<CreateApplicationRequest>,
) -> ApiResult<impl IntoResponse> {
    let event_id = EventId(parse_uuid(&body.event_id, "event")?);
    let application = state
        .applications
        .create_application(
            actor.id,
            NewApplication {
                event_id,
                motivation: body.motivation,
                resume_ref: body.resume_ref,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn list_my_applications(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.applications.list_my_applications(&actor).await?))
}

async fn get_application(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = ApplicationId(parse_uuid(&id, "application")?);
    Ok(Json(state.applications.get_application(id, &actor).await?))
}

async fn decide_application(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = ApplicationId(parse_uuid(&id, "application")?);
    Ok(Json(
        state.applications.decide_application(id, body.decision, &actor).await?,
    ))
}

async fn list_event_applications(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(event_id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<impl IntoResponse> {
    let event_id = EventId(parse_uuid(&event_id, "event")?);
    let status = filter
        .status
        .as_deref()
        .map(|s| {
            ApplicationStatus::parse(s)
                .ok_or_else(|| WorkflowError::InvalidArgument(format!("unknown application status '{}'", s)))
        })
        .transpose()?;
    Ok(Json(
        state
            .applications
            .list_applications_for_event(event_id, &actor, status)
            .await?,
    ))
}

async fn list_event_volunteers(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(event_id): Path<String>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<impl IntoResponse> {
    let event_id = EventId(parse_uuid(&event_id, "event")?);
    let status = membership_status(&filter)?;
    Ok(Json(
        state.memberships.list_event_volunteers(event_id, &actor, status).await?,
    ))
}

async fn list_my_memberships(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(filter): Query<StatusFilter>,
) -> ApiResult<impl IntoResponse> {
    let status = membership_status(&filter)?;
    Ok(Json(state.memberships.list_my_memberships(&actor, status).await?))
}

fn membership_status(filter: &StatusFilter) -> Result<Option<MembershipStatus>, WorkflowError> {
    filter
        .status
        .as_deref()
        .map(|s| {
            MembershipStatus::parse(s)
                .ok_or_else(|| WorkflowError::InvalidArgument(format!("unknown membership status '{}'", s)))
        })
        .transpose()
}

async fn remove_volunteer(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path((event_id, user_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let event_id = EventId(parse_uuid(&event_id, "event")?);
    let user_id = UserId(parse_uuid(&user_id, "user")?);
    Ok(Json(
        state.memberships.remove_volunteer(event_id, user_id, &actor).await?,
    ))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(event_id): Path<String>,
    Json(draft): Json<TaskDraft>,
) -> ApiResult<impl IntoResponse> {
    let event_id = EventId(parse_uuid(&event_id, "event")?);
    let task = state.tasks.create_task(event_id, draft, &actor).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn list_event_tasks(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(event_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let event_id = EventId(parse_uuid(&event_id, "event")?);
    Ok(Json(state.tasks.list_tasks_for_event(event_id, &actor).await?))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = TaskId(parse_uuid(&id, "task")?);
    Ok(Json(state.tasks.get_task(id, &actor).await?))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<impl IntoResponse> {
    let id = TaskId(parse_uuid(&id, "task")?);
    Ok(Json(state.tasks.update_task(id, patch, &actor).await?))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = TaskId(parse_uuid(&id, "task")?);
    let removed = state.tasks.delete_task(id, &actor).await?;
    Ok(Json(json!({
        "task_id": id,
        "removed_assignments": removed.len(),
    })))
}

async fn assign_task(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    Json(body): Json<AssignTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let task_id = TaskId(parse_uuid(&id, "task")?);
    let volunteer_id = UserId(parse_uuid(&body.volunteer_id, "volunteer")?);
    let assignment = state.tasks.assign_task(task_id, volunteer_id, &actor).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn list_task_assignments(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let task_id = TaskId(parse_uuid(&id, "task")?);
    Ok(Json(state.tasks.list_assignments_for_task(task_id, &actor).await?))
}

async fn list_my_assignments(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.tasks.list_my_assignments(&actor).await?))
}

async fn update_assignment(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    Json(body): Json<UpdateAssignmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = AssignmentId(parse_uuid(&id, "assignment")?);
    let status = WorkStatus::parse(&body.status)
        .ok_or_else(|| WorkflowError::InvalidArgument(format!("unknown assignment status '{}'", body.status)))?;
    Ok(Json(state.tasks.update_assignment(id, status, &actor).await?))
}

async fn remove_assignment(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = AssignmentId(parse_uuid(&id, "assignment")?);
    state.tasks.remove_assignment(id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.get_user(actor.id).await?))
}

async fn switch_role(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(body): Json<SwitchRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.switch_role(actor.id, &body.role).await?))
}

async fn recompute_role(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.roles.recompute_role(actor.id).await?))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(filter): Query<NotificationFilter>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        state.notifications.list_notifications(&actor, filter.unread_only).await?,
    ))
}

async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = NotificationId(parse_uuid(&id, "notification")?);
    Ok(Json(state.notifications.mark_read(id, &actor).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (WorkflowError::not_found("event", "x"), StatusCode::NOT_FOUND),
            (WorkflowError::PermissionDenied("no".into()), StatusCode::FORBIDDEN),
            (WorkflowError::Conflict("dup".into()), StatusCode::CONFLICT),
            (WorkflowError::InvalidState("decided".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (WorkflowError::InvalidArgument("bad".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
    }
}
