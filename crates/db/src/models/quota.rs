//! Quota counter rows.

use sqlx::FromRow;

use rishta_core::types::{DayKey, DbId, Timestamp};

/// A row from the `quota_counters` table. Keyed by `(user_id, day)`; a
/// missing row for a day means a count of zero.
#[derive(Debug, Clone, FromRow)]
pub struct QuotaCounter {
    pub user_id: DbId,
    pub day: DayKey,
    pub count: i32,
    pub updated_at: Timestamp,
}
