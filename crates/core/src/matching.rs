//! Matching domain vocabulary: like kinds, connection statuses, pair
//! normalization, and the outcome of recording a like.
//!
//! Status and kind constants must match the CHECK constraints in the
//! `likes` and `connections` migrations.

use serde::Serialize;

use crate::error::CoreError;
use crate::quota::QuotaDecision;
use crate::types::DbId;

/// A standard like.
pub const KIND_LIKE: &str = "like";

/// A super-like; counts against the same daily quota.
pub const KIND_SUPER_LIKE: &str = "super_like";

/// Connection awaiting a response. Part of the status vocabulary but never
/// produced by this core: mutual interest precedes every connection, so
/// connections are created directly in `accepted`.
pub const STATUS_PENDING: &str = "pending";

/// Connection with mutual interest; conversation is open.
pub const STATUS_ACCEPTED: &str = "accepted";

/// Connection closed by either participant. Terminal.
pub const STATUS_CLOSED: &str = "closed";

/// Whether `kind` is a recognized like kind.
pub fn is_valid_kind(kind: &str) -> bool {
    kind == KIND_LIKE || kind == KIND_SUPER_LIKE
}

/// Normalize an unordered user pair to `(low, high)`.
///
/// Connections are stored with `participant_low < participant_high` so the
/// unique index on the pair holds regardless of who liked first.
pub fn ordered_pair(a: DbId, b: DbId) -> (DbId, DbId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Reject a like a user aims at themselves.
pub fn ensure_not_self_like(actor_id: DbId, target_id: DbId) -> Result<(), CoreError> {
    if actor_id == target_id {
        return Err(CoreError::Validation(
            "cannot like your own profile".into(),
        ));
    }
    Ok(())
}

/// Result of recording a like action.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LikeOutcome {
    /// A new like was written. `connection_id` is set iff the like
    /// completed a mutual match.
    Created {
        mutual: bool,
        connection_id: Option<DbId>,
        quota: QuotaDecision,
    },
    /// The (actor, target) like already existed; nothing was written and
    /// no quota was consumed.
    AlreadyLiked {
        mutual: bool,
        connection_id: Option<DbId>,
    },
    /// The daily quota is exhausted; nothing was written.
    QuotaExhausted { quota: QuotaDecision },
}

impl LikeOutcome {
    /// The connection id, for any variant that carries one.
    pub fn connection_id(&self) -> Option<DbId> {
        match self {
            LikeOutcome::Created { connection_id, .. }
            | LikeOutcome::AlreadyLiked { connection_id, .. } => *connection_id,
            LikeOutcome::QuotaExhausted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_pair_normalizes() {
        assert_eq!(ordered_pair(3, 9), (3, 9));
        assert_eq!(ordered_pair(9, 3), (3, 9));
    }

    #[test]
    fn self_like_is_rejected() {
        let err = ensure_not_self_like(7, 7).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(ensure_not_self_like(7, 8).is_ok());
    }

    #[test]
    fn kind_validation() {
        assert!(is_valid_kind(KIND_LIKE));
        assert!(is_valid_kind(KIND_SUPER_LIKE));
        assert!(!is_valid_kind("wink"));
        assert!(!is_valid_kind(""));
    }

    #[test]
    fn outcome_connection_id_accessor() {
        let created = LikeOutcome::Created {
            mutual: true,
            connection_id: Some(11),
            quota: crate::quota::QuotaDecision::admitted(1, 5),
        };
        assert_eq!(created.connection_id(), Some(11));

        let exhausted = LikeOutcome::QuotaExhausted {
            quota: crate::quota::QuotaDecision::denied(5),
        };
        assert_eq!(exhausted.connection_id(), None);
    }
}
