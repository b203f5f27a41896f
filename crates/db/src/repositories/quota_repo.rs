//! Repository for the `quota_counters` table: the daily like-quota ledger.

use sqlx::{PgConnection, PgPool};

use rishta_core::quota::QuotaDecision;
use rishta_core::types::{DayKey, DbId};

pub struct QuotaRepo;

impl QuotaRepo {
    /// Admit a like action against the user's daily quota.
    ///
    /// Admission and increment are one statement: the conditional upsert
    /// takes the counter's row lock, so concurrent attempts from the same
    /// user cannot both pass a `used < limit` check. Exhaustion is reported
    /// as `allowed = false`, never as an error.
    pub async fn admit(
        pool: &PgPool,
        user_id: DbId,
        day: DayKey,
        limit: i32,
    ) -> Result<QuotaDecision, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::admit_on(&mut conn, user_id, day, limit).await
    }

    /// Transaction-scoped variant of [`admit`](Self::admit).
    ///
    /// The Interest Store runs admission inside its own transaction so a
    /// rejected like rolls the increment back with everything else.
    pub async fn admit_on(
        conn: &mut PgConnection,
        user_id: DbId,
        day: DayKey,
        limit: i32,
    ) -> Result<QuotaDecision, sqlx::Error> {
        if limit <= 0 {
            let used = Self::used_on(conn, user_id, day).await?;
            return Ok(QuotaDecision::denied(used));
        }

        let admitted: Option<i32> = sqlx::query_scalar(
            "INSERT INTO quota_counters (user_id, day, count) \
             VALUES ($1, $2, 1) \
             ON CONFLICT (user_id, day) DO UPDATE \
                SET count = quota_counters.count + 1, updated_at = NOW() \
                WHERE quota_counters.count < $3 \
             RETURNING count",
        )
        .bind(user_id)
        .bind(day)
        .bind(limit)
        .fetch_optional(&mut *conn)
        .await?;

        match admitted {
            Some(used) => Ok(QuotaDecision::admitted(used, limit)),
            None => {
                let used = Self::used_on(conn, user_id, day).await?;
                Ok(QuotaDecision::denied(used))
            }
        }
    }

    /// Number of likes the user has consumed on `day`. Missing row = 0.
    pub async fn used(pool: &PgPool, user_id: DbId, day: DayKey) -> Result<i32, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::used_on(&mut conn, user_id, day).await
    }

    async fn used_on(
        conn: &mut PgConnection,
        user_id: DbId,
        day: DayKey,
    ) -> Result<i32, sqlx::Error> {
        let count: Option<i32> =
            sqlx::query_scalar("SELECT count FROM quota_counters WHERE user_id = $1 AND day = $2")
                .bind(user_id)
                .bind(day)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(count.unwrap_or(0))
    }
}
