//! Repository for the `connections` table.

use sqlx::{PgConnection, PgPool};

use rishta_core::matching::{ordered_pair, STATUS_ACCEPTED, STATUS_CLOSED};
use rishta_core::types::DbId;

use crate::models::connection::Connection;

/// Column list for `connections` queries.
const COLUMNS: &str = "id, participant_low, participant_high, initiated_by, status, \
    message_count, last_message_at, created_at, responded_at, last_activity_at";

pub struct ConnectionRepo;

impl ConnectionRepo {
    /// Create the connection for a freshly detected mutual match.
    ///
    /// Runs on the Interest Store's transaction so the connection commits
    /// together with the two `is_mutual` flags. Born `accepted`: mutual
    /// interest already happened, there is no separate accept step.
    ///
    /// The pair's unique index resolves the same-instant race: the loser's
    /// insert hits `ON CONFLICT DO NOTHING` and the re-read returns the
    /// winner's id instead of erroring or duplicating.
    pub async fn create_on_mutual_match(
        conn: &mut PgConnection,
        user_a: DbId,
        user_b: DbId,
        initiated_by: DbId,
    ) -> Result<DbId, sqlx::Error> {
        let (low, high) = ordered_pair(user_a, user_b);

        let created: Option<DbId> = sqlx::query_scalar(
            "INSERT INTO connections \
                (participant_low, participant_high, initiated_by, status, responded_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (participant_low, participant_high) DO NOTHING \
             RETURNING id",
        )
        .bind(low)
        .bind(high)
        .bind(initiated_by)
        .bind(STATUS_ACCEPTED)
        .fetch_optional(&mut *conn)
        .await?;

        match created {
            Some(id) => Ok(id),
            None => {
                sqlx::query_scalar(
                    "SELECT id FROM connections \
                     WHERE participant_low = $1 AND participant_high = $2",
                )
                .bind(low)
                .bind(high)
                .fetch_one(&mut *conn)
                .await
            }
        }
    }

    /// Find a connection by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Connection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM connections WHERE id = $1");
        sqlx::query_as::<_, Connection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the connection for an unordered user pair, if any.
    pub async fn find_for_pair(
        pool: &PgPool,
        user_a: DbId,
        user_b: DbId,
    ) -> Result<Option<Connection>, sqlx::Error> {
        let (low, high) = ordered_pair(user_a, user_b);
        let query = format!(
            "SELECT {COLUMNS} FROM connections \
             WHERE participant_low = $1 AND participant_high = $2"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(low)
            .bind(high)
            .fetch_optional(pool)
            .await
    }

    /// List the caller's accepted connections, most recently active first.
    pub async fn list_accepted_for(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Connection>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM connections \
             WHERE (participant_low = $1 OR participant_high = $1) AND status = $2 \
             ORDER BY last_activity_at DESC"
        );
        sqlx::query_as::<_, Connection>(&query)
            .bind(user_id)
            .bind(STATUS_ACCEPTED)
            .fetch_all(pool)
            .await
    }

    /// Close a connection. Terminal; there is no resurrection.
    ///
    /// Returns `false` if the connection was already closed (idempotent) or
    /// does not exist. Participant authorization is the caller's concern.
    pub async fn close(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE connections \
             SET status = $2, last_activity_at = NOW() \
             WHERE id = $1 AND status <> $2",
        )
        .bind(id)
        .bind(STATUS_CLOSED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
