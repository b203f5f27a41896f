//! Message rows.

use serde::Serialize;
use sqlx::FromRow;

use rishta_core::types::{DbId, Timestamp};

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub connection_id: DbId,
    pub sender_id: DbId,
    pub body: String,
    /// One of `rishta_core::conversation::{MESSAGE_SENT, MESSAGE_DELIVERED,
    /// MESSAGE_FAILED}`. `failed` marks a degraded non-transactional append:
    /// durable, but excluded from live fan-out.
    pub status: String,
    pub created_at: Timestamp,
}

impl Message {
    pub fn is_broadcastable(&self) -> bool {
        self.status != rishta_core::conversation::MESSAGE_FAILED
    }
}
