//! Integration tests for the conversation endpoints: append, history,
//! authorization, and the persist-before-broadcast contract.

mod common;

use axum::http::StatusCode;
use common::{
    assert_error_code, body_json, get_auth, post_json, seed_matched_pair, seed_user, token_for,
};
use sqlx::PgPool;

use rishta_db::repositories::ConnectionRepo;

// ---------------------------------------------------------------------------
// Test: send then read back in order
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn send_and_read_history_in_order(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (a, b, connection_id) = seed_matched_pair(&pool).await;

    let response = post_json(
        app.clone(),
        &format!("/api/v1/connections/{connection_id}/messages"),
        Some(&token_for(a.id)),
        serde_json::json!({ "body": "hi" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["body"], "hi");
    assert_eq!(json["data"]["sender_id"], a.id);
    // No live room members, so the message stays `sent`.
    assert_eq!(json["data"]["status"], "sent");

    let response = post_json(
        app.clone(),
        &format!("/api/v1/connections/{connection_id}/messages"),
        Some(&token_for(b.id)),
        serde_json::json!({ "body": "hello" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // History is chronological regardless of sender.
    let response = get_auth(
        app,
        &format!("/api/v1/connections/{connection_id}/messages"),
        &token_for(a.id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let bodies: Vec<&str> = json["data"]
        .as_array()
        .expect("data should be an array")
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["hi", "hello"]);
}

// ---------------------------------------------------------------------------
// Test: history pages restart via the before-cursor
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn history_supports_before_cursor(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (a, _b, connection_id) = seed_matched_pair(&pool).await;
    let token = token_for(a.id);

    for i in 0..4 {
        post_json(
            app.clone(),
            &format!("/api/v1/connections/{connection_id}/messages"),
            Some(&token),
            serde_json::json!({ "body": format!("m{i}") }),
        )
        .await;
    }

    let response = get_auth(
        app.clone(),
        &format!("/api/v1/connections/{connection_id}/messages?limit=2"),
        &token,
    )
    .await;
    let page1 = body_json(response).await;
    let bodies: Vec<&str> = page1["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["m2", "m3"]);

    // Percent-encode the timestamp: a raw `+` offset would decode as a space.
    let cursor = page1["data"][0]["created_at"]
        .as_str()
        .unwrap()
        .replace('+', "%2B");
    let response = get_auth(
        app,
        &format!("/api/v1/connections/{connection_id}/messages?limit=2&before={cursor}"),
        &token,
    )
    .await;
    let page2 = body_json(response).await;
    let bodies: Vec<&str> = page2["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["m0", "m1"]);
}

// ---------------------------------------------------------------------------
// Test: non-participants always get Forbidden
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn non_participant_is_forbidden(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (_a, _b, connection_id) = seed_matched_pair(&pool).await;
    let outsider = seed_user(&pool, "omar").await;
    let token = token_for(outsider.id);

    // Reading the thread.
    let response = get_auth(
        app.clone(),
        &format!("/api/v1/connections/{connection_id}/messages"),
        &token,
    )
    .await;
    assert_error_code(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // Writing to the thread.
    let response = post_json(
        app.clone(),
        &format!("/api/v1/connections/{connection_id}/messages"),
        Some(&token),
        serde_json::json!({ "body": "hello strangers" }),
    )
    .await;
    assert_error_code(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    // Closing the connection.
    let response = post_json(
        app,
        &format!("/api/v1/connections/{connection_id}/close"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_error_code(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

// ---------------------------------------------------------------------------
// Test: message validation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_message_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (a, _b, connection_id) = seed_matched_pair(&pool).await;

    let response = post_json(
        app,
        &format!("/api/v1/connections/{connection_id}/messages"),
        Some(&token_for(a.id)),
        serde_json::json!({ "body": "   " }),
    )
    .await;
    assert_error_code(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

// ---------------------------------------------------------------------------
// Test: closed conversations refuse new messages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn closed_connection_refuses_messages(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (a, b, connection_id) = seed_matched_pair(&pool).await;

    let response = post_json(
        app.clone(),
        &format!("/api/v1/connections/{connection_id}/close"),
        Some(&token_for(a.id)),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let connection = ConnectionRepo::find_by_id(&pool, connection_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(connection.status, "closed");

    // The other participant can no longer write either.
    let response = post_json(
        app,
        &format!("/api/v1/connections/{connection_id}/messages"),
        Some(&token_for(b.id)),
        serde_json::json!({ "body": "wait" }),
    )
    .await;
    assert_error_code(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

// ---------------------------------------------------------------------------
// Test: a live-pushed message is always retrievable via history
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn live_push_matches_history(pool: PgPool) {
    let (app, state) = common::build_test_app_with_state(pool.clone());
    let (a, b, connection_id) = seed_matched_pair(&pool).await;

    // B is live and joined to the room (the WS handler does exactly this
    // after its authorization check).
    let mut rx = state.presence.register("conn-b".to_string(), b.id).await;
    state.presence.join("conn-b", connection_id).await;

    // A sends over HTTP; the append commits before the broadcast.
    let response = post_json(
        app.clone(),
        &format!("/api/v1/connections/{connection_id}/messages"),
        Some(&token_for(a.id)),
        serde_json::json!({ "body": "salaam" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The room member received the committed message.
    let pushed = rx.try_recv().expect("live push should have been delivered");
    let text = match pushed {
        axum::extract::ws::Message::Text(t) => t.to_string(),
        other => panic!("expected text frame, got {other:?}"),
    };
    let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(frame["type"], "new_message");
    assert_eq!(frame["connection_id"], connection_id);
    assert_eq!(frame["message"]["body"], "salaam");
    let pushed_id = frame["message"]["id"].as_i64().unwrap();

    // History returns the very same message.
    let response = get_auth(
        app,
        &format!("/api/v1/connections/{connection_id}/messages"),
        &token_for(b.id),
    )
    .await;
    let json = body_json(response).await;
    let stored = &json["data"][0];
    assert_eq!(stored["id"].as_i64(), Some(pushed_id));
    assert_eq!(stored["body"], "salaam");
    assert_eq!(stored["created_at"], frame["message"]["created_at"]);
    // Fan-out reached a live member, so the stored copy is `delivered`.
    assert_eq!(stored["status"], "delivered");
}

// ---------------------------------------------------------------------------
// Test: messages to a missing connection are NotFound
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn missing_connection_is_not_found(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let a = seed_user(&pool, "pari").await;

    let response = post_json(
        app,
        "/api/v1/connections/999999/messages",
        Some(&token_for(a.id)),
        serde_json::json!({ "body": "hello?" }),
    )
    .await;
    assert_error_code(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}
