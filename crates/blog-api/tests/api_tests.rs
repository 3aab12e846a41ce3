//! API Integration Tests
//!
//! Drives the full router over the in-memory store.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use blog_api::{
    create_router, create_router_for_testing, shutdown_signal, state::AppState, test_state,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const PASSWORD: &str = "correct-horse-battery";

/// Helper to create a test request
fn create_json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
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

fn test_app() -> (Arc<AppState>, Router) {
    let state = Arc::new(test_state());
    let app = create_router(state.clone());
    (state, app)
}

async fn sign_up(app: &Router, username: &str, email: &str) -> Value {
    let (status, body) = send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({ "username": username, "email": email, "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

async fn sign_in(app: &Router, email: &str) -> Value {
    let (status, body) = send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/signin",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn access_token(session: &Value) -> String {
    session["access_token"].as_str().unwrap().to_string()
}

/// Register a user, promote them, and sign in so the token carries the role
async fn admin_token(state: &AppState, app: &Router) -> String {
    let user = sign_up(app, "editor1", "editor@example.com").await;
    let id = user["id"].as_i64().unwrap();
    state.users.set_admin_role(id).await.unwrap();
    access_token(&sign_in(app, "editor@example.com").await)
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let (status, json) = send(&app, create_json_request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let app = create_router_for_testing();

    let (status, json) = send(&app, create_json_request("GET", "/ready", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert!(json["checks"].is_object());
}

#[tokio::test]
async fn test_readiness_reports_not_ready() {
    let (state, app) = test_app();
    state.set_ready(false);

    let (status, json) = send(&app, create_json_request("GET", "/ready", None, None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
}

#[tokio::test]
async fn test_shutdown_signal_flips_readiness() {
    let (state, app) = test_app();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let shutdown = tokio::spawn(shutdown_signal(state.clone(), async {
        let _ = rx.await;
    }));

    let (status, _) = send(&app, create_json_request("GET", "/ready", None, None)).await;
    assert_eq!(status, StatusCode::OK);

    tx.send(()).unwrap();
    shutdown.await.unwrap();

    let (status, json) = send(&app, create_json_request("GET", "/ready", None, None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["ready"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_router_for_testing();

    send(&app, create_json_request("GET", "/health", None, None)).await;
    let (status, json) = send(&app, create_json_request("GET", "/metrics", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["uptime_seconds"].is_number());
    assert!(json["total_requests"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api-docs/openapi.json", None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v1/auth/signup"].is_object());
    assert!(json["paths"]["/api/v1/categories/{slug}"]["get"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
}

// =============================================================================
// Auth API Tests
// =============================================================================

#[tokio::test]
async fn test_signup_signin_and_me() {
    let app = create_router_for_testing();

    let user = sign_up(&app, "writer1", "writer@example.com").await;
    assert_eq!(user["username"], "writer1");
    assert_eq!(user["role"], "user");

    let session = sign_in(&app, "writer@example.com").await;
    assert_eq!(session["token_type"], "Bearer");
    assert!(session["refresh_token"].is_string());

    let token = access_token(&session);
    let (status, me) = send(
        &app,
        create_json_request("GET", "/api/v1/users/me", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "writer@example.com");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = create_router_for_testing();

    let (status, _) = send(&app, create_json_request("GET", "/api/v1/users/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/users/me", Some("not-a-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], 401);
}

#[tokio::test]
async fn test_signup_errors() {
    let app = create_router_for_testing();
    sign_up(&app, "writer1", "writer@example.com").await;

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({ "username": "writer1", "email": "x@example.com", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "USERNAME_EXISTS");

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({ "username": "administrator", "email": "y@example.com", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "USERNAME_FORBIDDEN");

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/signup",
            None,
            Some(json!({ "username": "", "email": "z@example.com", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_signin_failures_look_the_same() {
    let app = create_router_for_testing();
    sign_up(&app, "writer1", "writer@example.com").await;

    let (unknown_status, unknown) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/signin",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "whatever1" })),
        ),
    )
    .await;
    let (wrong_status, wrong) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/signin",
            None,
            Some(json!({ "email": "writer@example.com", "password": "wrongpassword" })),
        ),
    )
    .await;

    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
}

#[tokio::test]
async fn test_refresh_rotation_and_logout() {
    let app = create_router_for_testing();
    sign_up(&app, "writer1", "writer@example.com").await;
    let session = sign_in(&app, "writer@example.com").await;
    let token_a = session["refresh_token"].as_str().unwrap().to_string();

    let refresh = |token: &str| {
        create_json_request(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": token })),
        )
    };

    let (status, rotated) = send(&app, refresh(&token_a)).await;
    assert_eq!(status, StatusCode::OK);
    let token_b = rotated["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = send(&app, refresh(&token_a)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/logout",
            None,
            Some(json!({ "refresh_token": token_b })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, refresh(&token_b)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// User API Tests
// =============================================================================

#[tokio::test]
async fn test_change_password_endpoint() {
    let app = create_router_for_testing();
    sign_up(&app, "writer1", "writer@example.com").await;
    let token = access_token(&sign_in(&app, "writer@example.com").await);

    let change = |old: &str, new: &str| {
        create_json_request(
            "PUT",
            "/api/v1/users/me/password",
            Some(&token),
            Some(json!({ "old_password": old, "new_password": new })),
        )
    };

    let (status, json) = send(&app, change(PASSWORD, PASSWORD)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "PASSWORD_UNCHANGED");

    let (status, _) = send(&app, change("wrong-password", "another-password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, change(PASSWORD, "another-password")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_public_profiles_hide_email() {
    let app = create_router_for_testing();
    let user = sign_up(&app, "writer1", "writer@example.com").await;
    let id = user["id"].as_i64().unwrap();

    let (status, profile) = send(
        &app,
        create_json_request("GET", &format!("/api/v1/users/{id}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "writer1");
    assert!(profile.get("email").is_none());

    let (status, profile) = send(
        &app,
        create_json_request("GET", "/api/v1/profiles/writer1", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["id"], id);

    let (status, _) = send(
        &app,
        create_json_request("GET", "/api/v1/profiles/nobody1", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_promote_requires_admin() {
    let (state, app) = test_app();
    let admin = admin_token(&state, &app).await;
    let user = sign_up(&app, "writer1", "writer@example.com").await;
    let id = user["id"].as_i64().unwrap();
    let token = access_token(&sign_in(&app, "writer@example.com").await);

    let uri = format!("/api/v1/users/{id}/admin");
    let (status, _) = send(&app, create_json_request("POST", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&app, create_json_request("POST", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["role"], "admin");

    let (status, json) = send(&app, create_json_request("POST", &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_ADMIN");
}

// =============================================================================
// Content API Tests
// =============================================================================

#[tokio::test]
async fn test_category_and_article_flow() {
    let (state, app) = test_app();
    let admin = admin_token(&state, &app).await;
    sign_up(&app, "writer1", "writer@example.com").await;
    let author = access_token(&sign_in(&app, "writer@example.com").await);
    sign_up(&app, "reader1", "reader@example.com").await;
    let reader = access_token(&sign_in(&app, "reader@example.com").await);

    // Only admins create categories
    let new_category = json!({ "name": "Rust Tips" });
    let (status, _) = send(
        &app,
        create_json_request("POST", "/api/v1/categories", Some(&author), Some(new_category.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, category) = send(
        &app,
        create_json_request("POST", "/api/v1/categories", Some(&admin), Some(new_category)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(category["slug"], "rust-tips");
    let category_id = category["id"].as_i64().unwrap();

    let (status, fetched) = send(
        &app,
        create_json_request("GET", "/api/v1/categories/rust-tips", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], category_id);
    assert_eq!(fetched["name"], "Rust Tips");

    let (status, article) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/articles",
            Some(&author),
            Some(json!({
                "title": "Borrowing without tears",
                "content": "Lifetimes are just names for regions of code.",
                "category": "rust-tips"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let article_id = article["id"].as_i64().unwrap();

    let (status, listed) = send(
        &app,
        create_json_request("GET", "/api/v1/articles?category=rust-tips", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let article_uri = format!("/api/v1/articles/{article_id}");
    let edit = json!({ "title": "Borrowing with fewer tears" });

    let (status, _) = send(
        &app,
        create_json_request("PATCH", &article_uri, Some(&reader), Some(edit.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        create_json_request("PATCH", &article_uri, Some(&author), Some(edit)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Borrowing with fewer tears");

    // A category with articles cannot be removed
    let category_uri = format!("/api/v1/categories/{category_id}");
    let (status, json) = send(
        &app,
        create_json_request("DELETE", &category_uri, Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CATEGORY_IN_USE");

    let (status, _) = send(
        &app,
        create_json_request("DELETE", &article_uri, Some(&author), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, create_json_request("GET", &article_uri, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        create_json_request("DELETE", &category_uri, Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_unknown_category_slug_is_not_found() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/categories/no-such-topic", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "CATEGORY_NOT_FOUND");
}

#[tokio::test]
async fn test_article_filters_cannot_be_combined() {
    let app = create_router_for_testing();

    let (status, _) = send(
        &app,
        create_json_request("GET", "/api/v1/articles?author_id=1&category=rust", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/articles?category=missing", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "CATEGORY_NOT_FOUND");
}
