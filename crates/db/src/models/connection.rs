//! Connection rows: the durable relationship record plus its conversation
//! thread rollups.

use serde::Serialize;
use sqlx::FromRow;

use rishta_core::types::{DbId, Timestamp};

/// A row from the `connections` table.
///
/// Participants are stored normalized (`participant_low < participant_high`)
/// so the pair's unique index holds regardless of like order. `initiated_by`
/// records the user whose like started the pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Connection {
    pub id: DbId,
    pub participant_low: DbId,
    pub participant_high: DbId,
    pub initiated_by: DbId,
    /// One of `rishta_core::matching::{STATUS_PENDING, STATUS_ACCEPTED, STATUS_CLOSED}`.
    pub status: String,
    /// Conversation rollup: number of messages appended to this thread.
    pub message_count: i64,
    /// Conversation rollup: timestamp of the most recent message.
    pub last_message_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub responded_at: Option<Timestamp>,
    pub last_activity_at: Timestamp,
}

impl Connection {
    /// Whether `user_id` is one of the two participants.
    pub fn has_participant(&self, user_id: DbId) -> bool {
        self.participant_low == user_id || self.participant_high == user_id
    }

    /// The participant that is not `user_id`.
    ///
    /// Callers must have verified membership first.
    pub fn other_participant(&self, user_id: DbId) -> DbId {
        if self.participant_low == user_id {
            self.participant_high
        } else {
            self.participant_low
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == rishta_core::matching::STATUS_ACCEPTED
    }
}
