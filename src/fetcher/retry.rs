// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::utils::exponential_backoff;

/// Per-`(identity, edition)` retry bookkeeping (§4.5.1). A newer edition
/// always starts a fresh attempt counter — the map is edition-keyed.
#[derive(Clone, Copy, Debug)]
pub struct RetryState {
    pub attempt: u32,
    pub next_at: DateTime<Utc>,
}

impl RetryState {
    pub fn first(now: DateTime<Utc>) -> Self {
        RetryState { attempt: 0, next_at: now }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_at <= now
    }

    /// Schedules the next attempt after a failure, using full-jitter
    /// exponential backoff bounded by `base`/`max`.
    pub fn backoff(&self, base: Duration, max: Duration, now: DateTime<Utc>) -> Self {
        let delay = exponential_backoff(base, max, self.attempt);
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        RetryState { attempt: self.attempt.saturating_add(1), next_at: now + delay }
    }
}
