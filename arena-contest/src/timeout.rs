//! Lazily evaluated timeout policies. Nothing here is scheduled: every check
//! compares stored timestamps against the time of the call.

use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    creator_timeout: Duration,
    payout_timeout: Duration,
}

impl TimeoutGuard {
    pub fn new(creator_timeout: Duration, payout_timeout: Duration) -> Self {
        Self {
            creator_timeout,
            payout_timeout,
        }
    }

    pub fn creator_timeout(&self) -> Duration {
        self.creator_timeout
    }

    pub fn payout_timeout(&self) -> Duration {
        self.payout_timeout
    }

    /// An open game with players whose creator sat on it past the creator timeout.
    pub fn is_abandoned(
        &self,
        opened_at: DateTime<Utc>,
        player_count: usize,
        now: DateTime<Utc>,
    ) -> bool {
        player_count > 0 && elapsed_exceeds(opened_at, now, self.creator_timeout)
    }

    /// A closed game whose gamemaster has not paid out within the payout timeout.
    pub fn withdrawal_allowed(&self, closed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        elapsed_exceeds(closed_at, now, self.payout_timeout)
    }
}

/// Strictly more than `limit` has passed since `since`.
/// A clock running backwards counts as no time.
pub fn elapsed_exceeds(since: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> bool {
    (now - since).to_std().map_or(false, |elapsed| elapsed > limit)
}
