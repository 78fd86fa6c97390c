//! End-to-end tests of the HTTP API, driven through the router with `oneshot`

mod test_helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use refgate::api::principal::{TEAMS_HEADER, USER_HEADER};
use refgate::api::{self, AppState};
use refgate::policy::protection::ProtectionRule;
use refgate::policy::ConfigProtectionStore;

use test_helpers::Fixture;

const REFS: &str = "/api/v1/repos/alice/demo/git/refs";

/// Router over the fixture with `main` protected and `v*` tags restricted to alice
fn create_test_app(fixture: &Fixture) -> axum::Router {
    let protection = ConfigProtectionStore::default()
        .with_protected_branch("alice/demo", "main")
        .with_tag_rule("alice/demo", ProtectionRule::new("v*").allow_user("alice"));

    api::router(Arc::new(AppState {
        repositories: fixture.manager(),
        protection: Arc::new(protection),
        noreply_domain: "noreply.localhost".to_string(),
    }))
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_create_branch() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    let (status, body) = send(
        &app,
        request(
            "POST",
            REFS,
            Some("bob"),
            Some(json!({"ref": "refs/heads/feature-x", "target": fixture.first})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(body["ref"], "refs/heads/feature-x");
    assert_eq!(body["object"]["sha"], fixture.first.as_str());
    assert_eq!(body["object"]["type"], "commit");
    assert_eq!(
        body["object"]["url"],
        format!(
            "http://localhost:3000/api/v1/repos/alice/demo/git/commits/{}",
            fixture.first
        )
    );
    assert_eq!(fixture.read_ref("refs/heads/feature-x"), Some(fixture.first.clone()));
}

#[tokio::test]
async fn test_create_existing_tag_conflicts() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);
    let create = || {
        request(
            "POST",
            REFS,
            Some("alice"),
            Some(json!({"RefName": "refs/tags/v1", "Target": fixture.second})),
        )
    };

    let (status, _) = send(&app, create()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, create()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "REF_CONFLICT");
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn test_delete_protected_branch_is_refused() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    let (status, body) = send(
        &app,
        request("DELETE", &format!("{}/heads/main", REFS), Some("alice"), None),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error_code"], "PROTECTED_REF");
    assert_eq!(fixture.read_ref("refs/heads/main"), Some(fixture.second.clone()));
}

#[tokio::test]
async fn test_pull_namespace_is_read_only() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    for user in ["alice", "bob"] {
        let (status, body) = send(
            &app,
            request(
                "POST",
                REFS,
                Some(user),
                Some(json!({"ref": "refs/pull/1/head", "target": fixture.first})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error_code"], "READ_ONLY_NAMESPACE");
    }
    assert_eq!(fixture.read_ref("refs/pull/1/head"), None);
}

#[tokio::test]
async fn test_protected_tag_for_other_user() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    let (status, _) = send(
        &app,
        request(
            "POST",
            REFS,
            Some("bob"),
            Some(json!({"ref": "refs/tags/v9", "sha": "main"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    // Team membership comes from the proxy header; no rule lists this team
    let request = Request::builder()
        .method("POST")
        .uri(REFS)
        .header(USER_HEADER, "bob")
        .header(TEAMS_HEADER, "qa, docs")
        .header("content-type", "application/json")
        .body(Body::from(json!({"ref": "refs/tags/v9", "target": "main"}).to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(fixture.read_ref("refs/tags/v9"), None);
}

#[tokio::test]
async fn test_mutations_require_a_user() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    let (status, body) = send(
        &app,
        request(
            "POST",
            REFS,
            None,
            Some(json!({"ref": "refs/heads/x", "target": "main"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        request("DELETE", &format!("{}/heads/dev", REFS), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(fixture.read_ref("refs/heads/dev").is_some());
}

#[tokio::test]
async fn test_update_and_delete_through_patch() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);
    let dev = format!("{}/heads/dev", REFS);

    let (status, body) = send(
        &app,
        request("PATCH", &dev, Some("bob"), Some(json!({"target": "main"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["ref"], "refs/heads/dev");
    assert_eq!(body["object"]["sha"], fixture.second.as_str());

    // An empty target deletes
    let (status, _) = send(
        &app,
        request("PATCH", &dev, Some("bob"), Some(json!({"target": ""}))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(fixture.read_ref("refs/heads/dev"), None);

    let (status, body) = send(&app, request("DELETE", &dev, Some("bob"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "REF_NOT_FOUND");
}

#[tokio::test]
async fn test_get_returns_object_or_array() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    let (status, body) = send(&app, request("GET", REFS, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(3));

    let main = format!("{}/heads/main", REFS);
    let (status, body) = send(&app, request("GET", &main, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ref"], "refs/heads/main");
    assert_eq!(body["object"]["sha"], fixture.second.as_str());

    let (status, body) = send(&app, request("GET", &format!("{}/heads", REFS), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, _) = send(&app, request("GET", &format!("{}/heads/nope", REFS), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_repository_and_bad_bodies() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    let (status, body) = send(
        &app,
        request("GET", "/api/v1/repos/alice/missing/git/refs", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "REPOSITORY_NOT_FOUND");

    let (status, _) = send(
        &app,
        request("POST", REFS, Some("bob"), Some(json!({"target": "main"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        request(
            "POST",
            REFS,
            Some("bob"),
            Some(json!({"ref": "refs/heads/x", "target": "does-not-exist"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "TARGET_NOT_FOUND");
}

#[tokio::test]
async fn test_health() {
    let fixture = Fixture::new();
    let app = create_test_app(&fixture);

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
