//! Integration tests for the Conversation Ledger: atomic appends with
//! rollups, authorization, ordering, and cursor pagination.

use assert_matches::assert_matches;
use sqlx::PgPool;

use rishta_core::conversation::{MESSAGE_DELIVERED, MESSAGE_SENT};
use rishta_core::error::CoreError;
use rishta_core::matching::KIND_LIKE;
use rishta_db::repositories::{AppendError, ConnectionRepo, LikeRepo, MessageRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, name: &str) -> i64 {
    UserRepo::create(pool, name, None)
        .await
        .expect("user insert should succeed")
        .id
}

/// Create two users with a mutual match, returning (a, b, connection_id).
async fn seed_matched_pair(pool: &PgPool) -> (i64, i64, i64) {
    let a = seed_user(pool, "gauri").await;
    let b = seed_user(pool, "hassan").await;
    LikeRepo::record_like(pool, a, b, KIND_LIKE, 5)
        .await
        .expect("first like");
    let outcome = LikeRepo::record_like(pool, b, a, KIND_LIKE, 5)
        .await
        .expect("reciprocal like");
    let connection_id = outcome.connection_id().expect("match should produce an id");
    (a, b, connection_id)
}

// ---------------------------------------------------------------------------
// Test: append updates the thread rollups atomically
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn append_updates_rollups(pool: PgPool) {
    let (a, b, connection_id) = seed_matched_pair(&pool).await;

    let first = MessageRepo::append(&pool, connection_id, a, "hi")
        .await
        .expect("append should succeed");
    assert_eq!(first.status, MESSAGE_SENT);
    assert_eq!(first.sender_id, a);

    let second = MessageRepo::append(&pool, connection_id, b, "hello")
        .await
        .expect("append should succeed");

    let connection = ConnectionRepo::find_by_id(&pool, connection_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(connection.message_count, 2);
    assert_eq!(connection.last_message_at, Some(second.created_at));
    assert_eq!(connection.last_activity_at, second.created_at);
}

// ---------------------------------------------------------------------------
// Test: history returns chronological order regardless of writer
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn history_is_chronological(pool: PgPool) {
    let (a, b, connection_id) = seed_matched_pair(&pool).await;

    MessageRepo::append(&pool, connection_id, a, "hi").await.unwrap();
    MessageRepo::append(&pool, connection_id, b, "hello").await.unwrap();

    let history = MessageRepo::history(&pool, connection_id, None, 50)
        .await
        .unwrap();
    let bodies: Vec<&str> = history.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, ["hi", "hello"]);
}

// ---------------------------------------------------------------------------
// Test: history pages restart via the before-cursor
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn history_cursor_pagination(pool: PgPool) {
    let (a, _b, connection_id) = seed_matched_pair(&pool).await;

    for i in 0..5 {
        MessageRepo::append(&pool, connection_id, a, &format!("m{i}"))
            .await
            .unwrap();
    }

    // Most recent page of two.
    let page1 = MessageRepo::history(&pool, connection_id, None, 2).await.unwrap();
    let bodies1: Vec<&str> = page1.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies1, ["m3", "m4"]);

    // Restart below the oldest message of the previous page.
    let cursor = page1.first().unwrap().created_at;
    let page2 = MessageRepo::history(&pool, connection_id, Some(cursor), 2)
        .await
        .unwrap();
    let bodies2: Vec<&str> = page2.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies2, ["m1", "m2"]);
}

// ---------------------------------------------------------------------------
// Test: non-participants are rejected with Forbidden
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn append_rejects_non_participant(pool: PgPool) {
    let (_a, _b, connection_id) = seed_matched_pair(&pool).await;
    let outsider = seed_user(&pool, "imran").await;

    let err = MessageRepo::append(&pool, connection_id, outsider, "let me in")
        .await
        .expect_err("outsider append must fail");
    assert_matches!(err, AppendError::Domain(CoreError::Forbidden(_)));

    // Nothing was appended.
    let history = MessageRepo::history(&pool, connection_id, None, 50)
        .await
        .unwrap();
    assert!(history.is_empty());
}

// ---------------------------------------------------------------------------
// Test: appends to a closed connection are rejected
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn append_rejects_closed_connection(pool: PgPool) {
    let (a, _b, connection_id) = seed_matched_pair(&pool).await;

    ConnectionRepo::close(&pool, connection_id).await.unwrap();

    let err = MessageRepo::append(&pool, connection_id, a, "anyone there?")
        .await
        .expect_err("append to closed connection must fail");
    assert_matches!(err, AppendError::Domain(CoreError::Forbidden(_)));
}

// ---------------------------------------------------------------------------
// Test: append to a missing connection is NotFound
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn append_rejects_missing_connection(pool: PgPool) {
    let a = seed_user(&pool, "gauri").await;

    let err = MessageRepo::append(&pool, 999_999, a, "hello?")
        .await
        .expect_err("append to missing connection must fail");
    assert_matches!(err, AppendError::Domain(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Test: delivery marking only touches sent messages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn mark_delivered_transitions_sent_only(pool: PgPool) {
    let (a, _b, connection_id) = seed_matched_pair(&pool).await;

    let message = MessageRepo::append(&pool, connection_id, a, "hi").await.unwrap();
    assert!(MessageRepo::mark_delivered(&pool, message.id).await.unwrap());

    let history = MessageRepo::history(&pool, connection_id, None, 50)
        .await
        .unwrap();
    assert_eq!(history[0].status, MESSAGE_DELIVERED);

    // A second marking is a no-op: the message is no longer `sent`.
    assert!(!MessageRepo::mark_delivered(&pool, message.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: concurrent appends keep the rollup count exact
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_appends_keep_exact_count(pool: PgPool) {
    let (a, b, connection_id) = seed_matched_pair(&pool).await;

    let mut tasks = Vec::new();
    for i in 0..4 {
        let p = pool.clone();
        let sender = if i % 2 == 0 { a } else { b };
        tasks.push(tokio::spawn(async move {
            MessageRepo::append(&p, connection_id, sender, &format!("msg-{i}")).await
        }));
    }
    for task in tasks {
        task.await
            .expect("task should not panic")
            .expect("append should succeed");
    }

    let connection = ConnectionRepo::find_by_id(&pool, connection_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(connection.message_count, 4);

    let history = MessageRepo::history(&pool, connection_id, None, 50)
        .await
        .unwrap();
    assert_eq!(history.len(), 4);
}
