//! Conversation domain vocabulary: message statuses, body validation, and
//! history paging bounds.

use crate::error::CoreError;

/// Message persisted atomically with its thread rollup update.
pub const MESSAGE_SENT: &str = "sent";

/// Message that reached at least one live recipient via fan-out.
pub const MESSAGE_DELIVERED: &str = "delivered";

/// Message persisted through the degraded non-transactional path; durable
/// but its rollup update is unverified. Never broadcast live.
pub const MESSAGE_FAILED: &str = "failed";

/// Maximum accepted message body length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2_000;

/// Default page size for history queries.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Maximum page size for history queries.
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Validate a message body before any write.
///
/// Empty (or whitespace-only) and oversized bodies are rejected.
pub fn validate_body(body: &str) -> Result<(), CoreError> {
    if body.trim().is_empty() {
        return Err(CoreError::Validation("message body is empty".into()));
    }
    if body.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(CoreError::Validation(format!(
            "message body exceeds {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Clamp a requested history page size to `1..=MAX_HISTORY_LIMIT`.
pub fn clamp_history_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}
