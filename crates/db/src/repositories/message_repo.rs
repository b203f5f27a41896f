//! Repository for the `messages` table: the Conversation Ledger.
//!
//! Appends are atomic with the connection's thread rollups. When the store
//! cannot open or commit the transaction, the append degrades to a
//! sequential best-effort write recorded with `status = failed` -- the
//! outcome is never silently lost, and callers can tell a broadcastable
//! message from an unverified one.

use sqlx::PgPool;

use rishta_core::conversation::{MESSAGE_DELIVERED, MESSAGE_FAILED, MESSAGE_SENT};
use rishta_core::error::CoreError;
use rishta_core::types::{DbId, Timestamp};

use crate::models::connection::Connection;
use crate::models::message::Message;

/// Column list for `messages` queries.
const MESSAGE_COLUMNS: &str = "id, connection_id, sender_id, body, status, created_at";

/// Column list for the connection row locked during an append.
const CONNECTION_COLUMNS: &str = "id, participant_low, participant_high, initiated_by, status, \
    message_count, last_message_at, created_at, responded_at, last_activity_at";

/// Error from [`MessageRepo::append`]: a domain rejection (unauthorized
/// sender, closed or missing connection) or a storage failure.
#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

pub struct MessageRepo;

impl MessageRepo {
    /// Append a message to a connection's thread.
    ///
    /// Verifies the sender is a participant of an `accepted` connection,
    /// inserts the message, and updates the thread rollups, as one
    /// transaction. On a coordination failure the degraded path applies;
    /// domain rejections are never retried or degraded.
    pub async fn append(
        pool: &PgPool,
        connection_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> Result<Message, AppendError> {
        match Self::append_atomic(pool, connection_id, sender_id, body).await {
            Err(AppendError::Storage(e)) if is_coordination_failure(&e) => {
                tracing::warn!(
                    connection_id,
                    sender_id,
                    error = %e,
                    "transactional append failed, degrading to sequential append"
                );
                Self::append_degraded(pool, connection_id, sender_id, body).await
            }
            other => other,
        }
    }

    /// The normal path: verify + insert + rollup in one transaction.
    async fn append_atomic(
        pool: &PgPool,
        connection_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> Result<Message, AppendError> {
        let mut tx = pool.begin().await?;

        // Lock the connection row: concurrent appends to one thread
        // serialize here, keeping the rollup counters exact and the commit
        // order equal to the append order.
        let connection = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = $1 FOR UPDATE"
        ))
        .bind(connection_id)
        .fetch_optional(&mut *tx)
        .await?;

        let connection = connection.ok_or(CoreError::NotFound {
            entity: "Connection",
            id: connection_id,
        })?;
        authorize_sender(&connection, sender_id)?;

        let message = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages (connection_id, sender_id, body, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(connection_id)
        .bind(sender_id)
        .bind(body)
        .bind(MESSAGE_SENT)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE connections \
             SET message_count = message_count + 1, \
                 last_message_at = $2, \
                 last_activity_at = $2 \
             WHERE id = $1",
        )
        .bind(connection_id)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    /// Last-resort path: sequential append recorded as `failed`.
    ///
    /// The message row is durable but its rollup update is best-effort and
    /// unverified, so the message must not be broadcast live; readers get
    /// it from `history`.
    async fn append_degraded(
        pool: &PgPool,
        connection_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> Result<Message, AppendError> {
        let connection = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = $1"
        ))
        .bind(connection_id)
        .fetch_optional(pool)
        .await?;

        let connection = connection.ok_or(CoreError::NotFound {
            entity: "Connection",
            id: connection_id,
        })?;
        authorize_sender(&connection, sender_id)?;

        let message = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages (connection_id, sender_id, body, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(connection_id)
        .bind(sender_id)
        .bind(body)
        .bind(MESSAGE_FAILED)
        .fetch_one(pool)
        .await?;

        tracing::warn!(
            connection_id,
            message_id = message.id,
            "degraded append persisted with status=failed"
        );

        if let Err(e) = sqlx::query(
            "UPDATE connections \
             SET message_count = message_count + 1, \
                 last_message_at = $2, \
                 last_activity_at = $2 \
             WHERE id = $1",
        )
        .bind(connection_id)
        .bind(message.created_at)
        .execute(pool)
        .await
        {
            tracing::warn!(connection_id, error = %e, "rollup update failed after degraded append");
        }

        Ok(message)
    }

    /// Chronological page of a connection's thread.
    ///
    /// Fetches newest-first below the optional `before` cursor, then
    /// reverses so the caller renders oldest-to-newest. Restartable: pass
    /// the `created_at` of the first message of the previous page.
    pub async fn history(
        pool: &PgPool,
        connection_id: DbId,
        before: Option<Timestamp>,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE connection_id = $1 \
               AND ($2::timestamptz IS NULL OR created_at < $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        let mut messages = sqlx::query_as::<_, Message>(&query)
            .bind(connection_id)
            .bind(before)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        messages.reverse();
        Ok(messages)
    }

    /// Mark a message delivered once fan-out reached a live recipient.
    ///
    /// Only `sent` messages are eligible; `failed` stays `failed`.
    pub async fn mark_delivered(pool: &PgPool, message_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE messages SET status = $2 WHERE id = $1 AND status = $3",
        )
        .bind(message_id)
        .bind(MESSAGE_DELIVERED)
        .bind(MESSAGE_SENT)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Participant-only authorization, applied to every append.
fn authorize_sender(connection: &Connection, sender_id: DbId) -> Result<(), CoreError> {
    if !connection.has_participant(sender_id) {
        return Err(CoreError::Forbidden(
            "only participants may send messages on this connection".into(),
        ));
    }
    if !connection.is_accepted() {
        return Err(CoreError::Forbidden("conversation is not open".into()));
    }
    Ok(())
}

/// Failures of transaction coordination itself (pool exhaustion, broken
/// connections), as opposed to statement-level errors.
fn is_coordination_failure(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
