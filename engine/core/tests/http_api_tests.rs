// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP API tests: routing, actor headers and error status mapping.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use volunteer_hub_core::application::repository_factory::Repositories;
use volunteer_hub_core::domain::event::{EventStatus, EventSummary};
use volunteer_hub_core::domain::user::{SystemRole, User};
use volunteer_hub_core::infrastructure::event_bus::EventBus;
use volunteer_hub_core::infrastructure::repositories::InMemoryWorkflowStore;
use volunteer_hub_core::infrastructure::token_issuer::JwtTokenIssuer;
use volunteer_hub_core::presentation::api::{app, AppState, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

struct TestApi {
    router: Router,
    organizer: User,
    applicant: User,
    event: EventSummary,
}

async fn test_api() -> TestApi {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let organizer = store
        .insert_user(User::new("Olu", "olu@example.org", SystemRole::Admin))
        .await;
    let applicant = store
        .insert_user(User::new("Ada", "ada@example.org", SystemRole::Standard))
        .await;
    let mut event = EventSummary::new(organizer.id, "River Cleanup");
    event.status = EventStatus::Published;
    event.accepting_volunteers = true;
    let event = store.insert_event(event).await;

    let state = AppState::new(
        Repositories::in_memory(store),
        Arc::new(JwtTokenIssuer::new("volunteer-hub-test", "http-secret", 600)),
        Arc::new(EventBus::new(64)),
    );

    TestApi {
        router: app(state),
        organizer,
        applicant,
        event,
    }
}

fn request(method: &str, uri: &str, as_user: Option<&User>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = as_user {
        builder = builder
            .header(ACTOR_ID_HEADER, user.id.to_string())
            .header(ACTOR_ROLE_HEADER, user.system_role.as_str());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn submit(api: &TestApi) -> (StatusCode, Value) {
    send(
        &api.router,
        request(
            "POST",
            "/api/v1/applications",
            Some(&api.applicant),
            Some(json!({
                "event_id": api.event.id.to_string(),
                "motivation": "Weekend availability",
            })),
        ),
    )
    .await
}

#[tokio::test]
async fn test_health_endpoint() {
    let api = test_api().await;
    let (status, body) = send(&api.router, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_actor_headers_is_unauthorized() {
    let api = test_api().await;
    let (status, body) = send(&api.router, request("GET", "/api/v1/applications/mine", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["kind"], "unauthorized");
}

#[tokio::test]
async fn test_apply_and_decide_over_http() {
    let api = test_api().await;

    let (status, created) = submit(&api).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "PENDING");

    let (status, body) = submit(&api).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["kind"], "conflict");

    let id = created["id"].as_str().unwrap().to_string();
    let decision_uri = format!("/api/v1/applications/{}/decision", id);

    // The applicant is not the organizer
    let (status, _) = send(
        &api.router,
        request("POST", &decision_uri, Some(&api.applicant), Some(json!({ "decision": "approve" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, decided) = send(
        &api.router,
        request("POST", &decision_uri, Some(&api.organizer), Some(json!({ "decision": "approve" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "APPROVED");

    let (status, body) = send(
        &api.router,
        request("POST", &decision_uri, Some(&api.organizer), Some(json!({ "decision": "reject" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "invalid_state");

    let (status, me) = send(&api.router, request("GET", "/api/v1/me", Some(&api.applicant), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["current_role"], "VOLUNTEER");

    let (status, notes) = send(
        &api.router,
        request("GET", "/api/v1/notifications?unread_only=true", Some(&api.applicant), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes.as_array().unwrap().len(), 1);

    let (status, memberships) = send(&api.router, request("GET", "/api/v1/me/memberships", Some(&api.applicant), None)).await;
    assert_eq!(status, StatusCode::OK);
    let memberships = memberships.as_array().unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0]["status"], "APPROVED");
    assert_eq!(memberships[0]["event_id"], api.event.id.to_string());

    let (status, removed) = send(
        &api.router,
        request("GET", "/api/v1/me/memberships?status=REMOVED", Some(&api.applicant), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(removed.as_array().unwrap().is_empty());

    let (status, _) = send(
        &api.router,
        request("GET", "/api/v1/me/memberships?status=MAYBE", Some(&api.applicant), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_identifiers_are_bad_requests() {
    let api = test_api().await;

    let (status, body) = send(
        &api.router,
        request("GET", "/api/v1/applications/not-a-uuid", Some(&api.applicant), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "invalid_argument");

    let (status, _) = send(
        &api.router,
        request(
            "GET",
            &format!("/api/v1/events/{}/volunteers?status=MAYBE", api.event.id),
            Some(&api.organizer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_switch_role_without_membership_is_forbidden() {
    let api = test_api().await;

    let (status, _) = send(
        &api.router,
        request("POST", "/api/v1/me/role", Some(&api.applicant), Some(json!({ "role": "VOLUNTEER" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &api.router,
        request("POST", "/api/v1/me/role", Some(&api.applicant), Some(json!({ "role": "ATTENDEE" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["current_role"], "ATTENDEE");
    assert_eq!(body["token"]["token_type"], "Bearer");
}

#[tokio::test]
async fn test_unknown_application_is_not_found() {
    let api = test_api().await;
    let (status, body) = send(
        &api.router,
        request(
            "GET",
            &format!("/api/v1/applications/{}", uuid_like()),
            Some(&api.organizer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["kind"], "not_found");
}

fn uuid_like() -> String {
    "6f1c2d2e-8a4b-4f5e-9c1d-2b3a4c5d6e7f".to_string()
}
