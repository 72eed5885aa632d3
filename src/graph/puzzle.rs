// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::identity::IdentityId;

/// `random_uuid@inserter_id`, unique per puzzle and traceable back to the
/// inserter that generated it without a lookup (Design Note, §4.7).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PuzzleId(pub String);

impl PuzzleId {
    pub fn new(inserter: IdentityId) -> Self {
        PuzzleId(format!("{}@{}", Uuid::new_v4(), inserter))
    }

    pub fn inserter(&self) -> Option<&str> {
        self.0.split('@').nth(1)
    }
}

/// A CAPTCHA-style introduction puzzle: an `OwnIdentity` inserts one so that
/// a stranger can solve it and be introduced into that identity's trust
/// list without a prior relationship (§4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntroductionPuzzle {
    pub id: PuzzleId,
    pub inserter: IdentityId,
    pub payload: Vec<u8>,
    pub mime_type: String,
    pub inserted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub solution: Option<String>,
    pub solved_by: Option<IdentityId>,
}

impl IntroductionPuzzle {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_solved(&self) -> bool {
        self.solved_by.is_some()
    }
}
