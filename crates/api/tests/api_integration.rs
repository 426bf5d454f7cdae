//! API integration tests.
//!
//! These tests drive the router end to end over a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
};
use punch_api::{AppState, auth_middleware, health_router, router as api_router};
use punch_common::config::{
    Config, DatabaseConfig, PunchConfig, RetrySettings, ServerConfig, StorageSettings,
};
use punch_db::entities::{
    punch_card,
    user::{self, ProfileVisibility},
};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test configuration.
fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            url: "https://example.com".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        storage: StorageSettings::default(),
        punch: PunchConfig::default(),
        retry: RetrySettings::default(),
    }
}

fn create_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        name: None,
        bio: None,
        avatar_url: None,
        token: format!("token-{id}"),
        password: String::new(),
        followers_count: 0,
        following_count: 0,
        profile_visibility: ProfileVisibility::Public,
        show_stores_visited: true,
        show_liked_restaurants: true,
        show_followers: true,
        show_following: true,
        show_history: true,
        is_admin: false,
        created_at: chrono::Utc::now().into(),
        updated_at: None,
    }
}

/// Create the API app over the given connection, with token auth applied.
fn create_app(db: DatabaseConnection) -> Router {
    let state = AppState::new(Arc::new(db), &create_test_config(), None);

    Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}

fn empty_db() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app: Router = health_router();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_scan_requires_auth() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(post_json("/api/punch/scan", None, r#"{"tagId":"04A1"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json("/api/punch/wallet", Some("nope"), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stream_requires_auth() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/conversations/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_wallet() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_user("u1", "alice")]])
        .append_query_results([Vec::<punch_card::Model>::new()])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json("/api/punch/wallet", Some("token-u1"), "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_create_restaurant_requires_admin() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[create_user("u1", "alice")]])
        .append_query_results([[create_user("u1", "alice")]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json(
            "/api/restaurants/create",
            Some("token-u1"),
            r#"{"name":"Taco Stand","total":8}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_signup_validation() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(post_json(
            "/api/auth/signup",
            None,
            r#"{"username":"ab","password":"longenough"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_signin_with_unknown_user() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json(
            "/api/auth/signin",
            None,
            r#"{"username":"ghost","password":"whatever"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_app(empty_db());

    let response = app
        .oneshot(post_json("/api/notes/create", None, "{}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
