// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::{cfg::enums::ScoreSign, graph::identity::IdentityId};

/// One viewer's opinion of one target, computed by `engine::recompute` from
/// the trust graph rooted at `viewer` (an `OwnIdentity`).
///
/// `rank` is the BFS hop-distance along positive-capacity trusters starting
/// from `viewer` (rank 0 is the viewer itself); `capacity` is looked up from
/// the rank via the fixed table in `engine::capacity`; `value` is the
/// integer-truncating weighted sum of incoming trust contributions
/// (§3 Score.value).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub viewer: IdentityId,
    pub target: IdentityId,
    pub rank: Option<u32>,
    pub capacity: u8,
    pub value: i32,
}

impl Score {
    /// A target with no path from the viewer at all: unreachable, rank and
    /// capacity both absent/zero, value zero (P4).
    pub fn unreachable(viewer: IdentityId, target: IdentityId) -> Self {
        Score { viewer, target, rank: None, capacity: 0, value: 0 }
    }

    pub fn sign(&self) -> ScoreSign {
        if self.value > 0 {
            ScoreSign::Positive
        } else if self.value < 0 {
            ScoreSign::Negative
        } else {
            ScoreSign::Zero
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.rank.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(b: u8) -> IdentityId {
        IdentityId([b; 32])
    }

    #[test]
    fn test_unreachable_has_zero_capacity_and_value() {
        let s = Score::unreachable(id(1), id(2));
        assert_eq!(s.capacity, 0);
        assert_eq!(s.value, 0);
        assert!(!s.is_reachable());
    }

    #[test]
    fn test_sign_matches_value() {
        let mut s = Score::unreachable(id(1), id(2));
        s.value = 5;
        assert_eq!(s.sign(), ScoreSign::Positive);
        s.value = -5;
        assert_eq!(s.sign(), ScoreSign::Negative);
        s.value = 0;
        assert_eq!(s.sign(), ScoreSign::Zero);
    }
}
