//! Repository for the `likes` table: the Interest Store.
//!
//! [`LikeRepo::record_like`] is the quota-gated like flow of the matching
//! core. The whole flow -- duplicate probe, quota admission, insert,
//! reciprocal lookup, mutual-match commit -- runs as a single serializable
//! transaction so no reader ever observes a mutual like without its
//! connection, or a connection without both mutual flags.

use std::time::Duration;

use sqlx::PgPool;

use rishta_core::matching::LikeOutcome;
use rishta_core::quota::{day_bucket, QuotaDecision};
use rishta_core::types::{DayKey, DbId};

use crate::models::like::Like;
use crate::repositories::{ConnectionRepo, QuotaRepo};

/// Column list for `likes` queries.
const COLUMNS: &str = "id, actor_id, target_id, kind, is_mutual, liked_on, created_at";

/// Attempts before a serialization conflict is surfaced to the caller.
const MAX_ATTEMPTS: u32 = 4;

/// Base backoff between retry attempts; grows linearly per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

pub struct LikeRepo;

impl LikeRepo {
    /// Record a like from `actor_id` to `target_id`.
    ///
    /// Optimistic concurrency: the transaction runs at SERIALIZABLE
    /// isolation, and serialization failures (two users liking each other
    /// in the same instant, or one user racing their own quota) are retried
    /// with fresh reads a bounded number of times before the storage error
    /// is surfaced.
    ///
    /// Self-like and kind validation are the API layer's concern; the
    /// schema's CHECK constraints back them up.
    pub async fn record_like(
        pool: &PgPool,
        actor_id: DbId,
        target_id: DbId,
        kind: &str,
        daily_limit: i32,
    ) -> Result<LikeOutcome, sqlx::Error> {
        let day = day_bucket(chrono::Utc::now());

        let mut attempt = 1;
        loop {
            match Self::try_record_like(pool, actor_id, target_id, kind, day, daily_limit).await {
                Err(e) if attempt < MAX_ATTEMPTS && is_serialization_conflict(&e) => {
                    tracing::debug!(
                        actor_id,
                        target_id,
                        attempt,
                        error = %e,
                        "like transaction conflicted, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// One attempt of the like flow.
    async fn try_record_like(
        pool: &PgPool,
        actor_id: DbId,
        target_id: DbId,
        kind: &str,
        day: DayKey,
        daily_limit: i32,
    ) -> Result<LikeOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        // Double-submits are a normal client behaviour: report the existing
        // state without consuming quota or writing anything.
        let existing = sqlx::query_as::<_, Like>(&format!(
            "SELECT {COLUMNS} FROM likes WHERE actor_id = $1 AND target_id = $2"
        ))
        .bind(actor_id)
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(like) = existing {
            drop(tx);
            return Self::already_liked_outcome(pool, actor_id, target_id, like.is_mutual).await;
        }

        // Quota admission shares the transaction: a later failure in this
        // flow must roll the increment back.
        let quota = QuotaRepo::admit_on(&mut *tx, actor_id, day, daily_limit).await?;
        if !quota.allowed {
            drop(tx);
            return Ok(LikeOutcome::QuotaExhausted { quota });
        }

        let inserted = sqlx::query_as::<_, Like>(&format!(
            "INSERT INTO likes (actor_id, target_id, kind, liked_on) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (actor_id, target_id) DO NOTHING \
             RETURNING {COLUMNS}"
        ))
        .bind(actor_id)
        .bind(target_id)
        .bind(kind)
        .bind(day)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_none() {
            // Lost a duplicate race after the probe above; rolling back
            // releases the quota increment and the idempotent path applies.
            drop(tx);
            let like = Self::find_between(pool, actor_id, target_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            return Self::already_liked_outcome(pool, actor_id, target_id, like.is_mutual).await;
        }

        let reciprocal = sqlx::query_as::<_, Like>(&format!(
            "SELECT {COLUMNS} FROM likes WHERE actor_id = $1 AND target_id = $2"
        ))
        .bind(target_id)
        .bind(actor_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(reciprocal) = reciprocal else {
            tx.commit().await?;
            return Ok(LikeOutcome::Created {
                mutual: false,
                connection_id: None,
                quota,
            });
        };

        // Mutual match: both flags and the connection commit together or
        // not at all.
        sqlx::query(
            "UPDATE likes SET is_mutual = true \
             WHERE (actor_id = $1 AND target_id = $2) \
                OR (actor_id = $2 AND target_id = $1)",
        )
        .bind(actor_id)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        // The relationship was initiated by whoever liked first, which at
        // match time is the reciprocal record's actor.
        let connection_id = ConnectionRepo::create_on_mutual_match(
            &mut *tx,
            actor_id,
            target_id,
            reciprocal.actor_id,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(actor_id, target_id, connection_id, "mutual match");
        Ok(LikeOutcome::Created {
            mutual: true,
            connection_id: Some(connection_id),
            quota,
        })
    }

    /// Build the idempotent `AlreadyLiked` outcome from committed state.
    async fn already_liked_outcome(
        pool: &PgPool,
        actor_id: DbId,
        target_id: DbId,
        is_mutual: bool,
    ) -> Result<LikeOutcome, sqlx::Error> {
        let connection_id = if is_mutual {
            ConnectionRepo::find_for_pair(pool, actor_id, target_id)
                .await?
                .map(|c| c.id)
        } else {
            None
        };
        Ok(LikeOutcome::AlreadyLiked {
            mutual: is_mutual,
            connection_id,
        })
    }

    /// The like from `actor_id` to `target_id`, if recorded.
    pub async fn find_between(
        pool: &PgPool,
        actor_id: DbId,
        target_id: DbId,
    ) -> Result<Option<Like>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM likes WHERE actor_id = $1 AND target_id = $2");
        sqlx::query_as::<_, Like>(&query)
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(pool)
            .await
    }

    /// Quota usage for a user on a given day, for surfacing `remaining`.
    pub async fn quota_decision_for(
        pool: &PgPool,
        user_id: DbId,
        day: DayKey,
        limit: i32,
    ) -> Result<QuotaDecision, sqlx::Error> {
        let used = QuotaRepo::used(pool, user_id, day).await?;
        if used >= limit {
            Ok(QuotaDecision::denied(used))
        } else {
            Ok(QuotaDecision {
                allowed: true,
                used,
                remaining: limit - used,
            })
        }
    }
}

/// PostgreSQL serialization failure (40001) or deadlock (40P01): the
/// optimistic-retry conflicts.
fn is_serialization_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}
