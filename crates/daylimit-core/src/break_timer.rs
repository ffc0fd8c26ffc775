//! Break deadline reconciliation
//!
//! A break is a stored UTC deadline. Nothing counts down in the background;
//! every check compares the deadline against the wall-clock time it is given.

use chrono::{DateTime, Duration, Utc};

/// Outcome of comparing a stored break deadline with the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakCheck {
    /// No break stored
    NoBreak,
    /// Break still running
    Active { until: DateTime<Utc> },
    /// Deadline has passed; the stored value is stale
    Expired { at: DateTime<Utc> },
}

/// Compare `break_until` with `now`
pub fn check_break(break_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> BreakCheck {
    match break_until {
        Some(until) if now < until => BreakCheck::Active { until },
        Some(at) => BreakCheck::Expired { at },
        None => BreakCheck::NoBreak,
    }
}

/// Minutes left in the break, rounded up. `None` when no break is running.
pub fn break_minutes_remaining(
    break_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<u32> {
    break_until.and_then(|until| daylimit_util::minutes_until_ceil(until, now))
}

/// Deadline for a break of `minutes` starting at `now`
pub fn break_deadline(now: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    now + Duration::minutes(i64::from(minutes))
}
