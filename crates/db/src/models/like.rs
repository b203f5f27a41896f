//! Like (interest) rows.

use serde::Serialize;
use sqlx::FromRow;

use rishta_core::types::{DayKey, DbId, Timestamp};

/// A row from the `likes` table.
///
/// Immutable once created, except for `is_mutual` which flips to `true`
/// exactly once when the reciprocal like arrives.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Like {
    pub id: DbId,
    pub actor_id: DbId,
    pub target_id: DbId,
    /// One of `rishta_core::matching::{KIND_LIKE, KIND_SUPER_LIKE}`.
    pub kind: String,
    pub is_mutual: bool,
    /// UTC day bucket of the action, for quota accounting and audit.
    pub liked_on: DayKey,
    pub created_at: Timestamp,
}
