// SPDX-License-Identifier: AGPL-3.0-or-later

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::identity::IdentityId;

/// An edge in the trust graph: `truster` vouches for `trustee` with an
/// integer value in `[-100, 100]` plus an optional free-text comment.
///
/// `value == 0` is distinct from "no edge" (P2): a zero-trust edge still
/// contributes a zero-capacity row to rank computation, it simply never
/// contributes score. Removing an edge entirely is `Engine::remove_trust`,
/// not `set_trust(0)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trust {
    pub truster: IdentityId,
    pub trustee: IdentityId,
    pub value: i8,
    pub comment: Option<String>,
    pub last_changed_at: DateTime<Utc>,
}

impl Trust {
    /// Clamps a raw incoming value into the valid `[-100, 100]` range (§4.2.1).
    pub fn clamp_value(raw: i32) -> i8 {
        raw.clamp(-100, 100) as i8
    }

    pub fn new(
        truster: IdentityId,
        trustee: IdentityId,
        raw_value: i32,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Trust {
            truster,
            trustee,
            value: Self::clamp_value(raw_value),
            comment,
            last_changed_at: now,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.value > 0
    }
}
