//! Daily like-quota policy.
//!
//! The quota is a per-user, per-calendar-day counter. Day boundaries are
//! always computed in UTC so that every server instance agrees on when a
//! user's quota resets, regardless of local clock configuration.

use serde::Serialize;

use crate::types::{DayKey, Timestamp};

/// Default number of like actions a user may issue per UTC day.
///
/// Overridable via the `DAILY_LIKE_LIMIT` environment variable.
pub const DEFAULT_DAILY_LIKE_LIMIT: i32 = 5;

/// Map a timestamp to its UTC quota day.
///
/// This is the only place day bucketing happens; callers must not derive
/// day keys from local time.
pub fn day_bucket(at: Timestamp) -> DayKey {
    at.date_naive()
}

/// Outcome of a quota admission check.
///
/// Exhaustion is a normal outcome (`allowed = false`), never an error;
/// errors are reserved for storage failure.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuotaDecision {
    /// Whether the action was admitted (and the counter incremented).
    pub allowed: bool,
    /// Number of likes consumed today, including this one if admitted.
    pub used: i32,
    /// Likes remaining today after this decision.
    pub remaining: i32,
}

impl QuotaDecision {
    /// An admitted decision for the given post-increment count.
    pub fn admitted(used: i32, limit: i32) -> Self {
        Self {
            allowed: true,
            used,
            remaining: (limit - used).max(0),
        }
    }

    /// A denied decision: the counter is already at (or beyond) the limit.
    pub fn denied(used: i32) -> Self {
        Self {
            allowed: false,
            used,
            remaining: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_bucket_is_utc_date() {
        // 23:59 UTC and 00:01 UTC the next day land in different buckets.
        let late = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 0).unwrap();
        let early = chrono::Utc.with_ymd_and_hms(2026, 3, 15, 0, 1, 0).unwrap();

        assert_ne!(day_bucket(late), day_bucket(early));
        assert_eq!(day_bucket(late).to_string(), "2026-03-14");
        assert_eq!(day_bucket(early).to_string(), "2026-03-15");
    }

    #[test]
    fn admitted_decision_counts_down() {
        let d = QuotaDecision::admitted(1, 5);
        assert!(d.allowed);
        assert_eq!(d.used, 1);
        assert_eq!(d.remaining, 4);

        let last = QuotaDecision::admitted(5, 5);
        assert!(last.allowed);
        assert_eq!(last.remaining, 0);
    }

    #[test]
    fn denied_decision_has_zero_remaining() {
        let d = QuotaDecision::denied(5);
        assert!(!d.allowed);
        assert_eq!(d.used, 5);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn remaining_never_negative() {
        // A limit lowered by config below an existing count must not
        // produce a negative remaining.
        let d = QuotaDecision::admitted(7, 5);
        assert_eq!(d.remaining, 0);
    }
}
