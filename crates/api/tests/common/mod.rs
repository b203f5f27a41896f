//! Shared helpers for API integration tests.
//!
//! Builds the application with the exact production middleware stack via
//! [`build_app_router`], and provides request/response helpers plus token
//! minting (the tests stand in for the external identity service).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use rishta_api::auth::jwt::{generate_access_token, JwtConfig};
use rishta_api::config::ServerConfig;
use rishta_api::router::build_app_router;
use rishta_api::state::AppState;
use rishta_api::ws::PresenceManager;
use rishta_db::models::user::User;
use rishta_db::repositories::{LikeRepo, UserRepo};

/// Build a test `JwtConfig` with a fixed secret.
pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        daily_like_limit: 5,
        jwt: test_jwt_config(),
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// Mirrors the construction in `main.rs` so integration tests exercise the
/// same middleware stack (CORS, request ID, timeout, tracing, panic
/// recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    let (app, _state) = build_test_app_with_state(pool);
    app
}

/// Like [`build_test_app`], but also returns the state for tests that need
/// direct access to the presence manager or event bus.
pub fn build_test_app_with_state(pool: PgPool) -> (Router, AppState) {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        presence: Arc::new(PresenceManager::new()),
        event_bus: Arc::new(rishta_events::EventBus::default()),
    };
    (build_app_router(state.clone(), &config), state)
}

/// Mint a bearer token for a user, as the identity service would.
pub fn token_for(user_id: i64) -> String {
    generate_access_token(user_id, &test_jwt_config()).expect("token generation should succeed")
}

/// Issue an unauthenticated GET request.
pub async fn get(app: Router, path: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request should build"),
    )
    .await
    .expect("request should not fail")
}

/// Issue a GET request with a bearer token.
pub async fn get_auth(app: Router, path: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(path)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request should build"),
    )
    .await
    .expect("request should not fail")
}

/// Issue a POST request with a JSON body and optional bearer token.
pub async fn post_json(
    app: Router,
    path: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.oneshot(
        builder
            .body(Body::from(body.to_string()))
            .expect("request should build"),
    )
    .await
    .expect("request should not fail")
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Seed a user row.
pub async fn seed_user(pool: &PgPool, name: &str) -> User {
    UserRepo::create(pool, name, None)
        .await
        .expect("user insert should succeed")
}

/// Seed two users with a mutual match, returning (a, b, connection_id).
pub async fn seed_matched_pair(pool: &PgPool) -> (User, User, i64) {
    let a = seed_user(pool, "mira").await;
    let b = seed_user(pool, "noor").await;
    LikeRepo::record_like(pool, a.id, b.id, rishta_core::matching::KIND_LIKE, 5)
        .await
        .expect("first like");
    let outcome = LikeRepo::record_like(pool, b.id, a.id, rishta_core::matching::KIND_LIKE, 5)
        .await
        .expect("reciprocal like");
    let connection_id = outcome.connection_id().expect("match should produce an id");
    (a, b, connection_id)
}

/// Assert a response carries the standard error envelope with `code`.
pub async fn assert_error_code(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected error body: {json}");
}
