// SPDX-License-Identifier: AGPL-3.0-or-later

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{cfg::enums::FetchState, graph::address::VersionedAddress};

/// Stable primary key for an `Identity`: `H(public_key)` (I1), a blake3
/// digest truncated to nothing — blake3 already produces 32 bytes, which is
/// the width used throughout the graph model.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub [u8; 32]);

impl IdentityId {
    /// Derives an `IdentityId` from a request or insert address's public-key
    /// material, enforcing invariant I1.
    pub fn derive(address: &VersionedAddress) -> Self {
        let digest = blake3::hash(&address.public_key().0);
        IdentityId(*digest.as_bytes())
    }
}

impl fmt::Debug for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityId({})", hex::encode(self.0))
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The local-user-owned extension of an `Identity`. Presence of this field
/// on an `IdentityRow` is the "two-variant tagged type" design note (§9):
/// rather than a parallel `OwnIdentity` hierarchy, `Identity` vs
/// `OwnIdentity` is `IdentityRow.own.is_some()`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnIdentityExtra {
    pub insert_address: VersionedAddress,
    pub created_at: DateTime<Utc>,
    pub last_inserted_at: Option<DateTime<Utc>>,
}

/// A participant in the trust graph: either a plain remote `Identity`, or
/// (when `own` is `Some`) an `OwnIdentity` the local user can insert as.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityRow {
    pub id: IdentityId,
    pub request_address: VersionedAddress,
    pub current_edition: u64,
    pub latest_edition_hint: u64,
    pub fetch_state: FetchState,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub last_changed_at: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
    pub nickname: Option<String>,
    pub publishes_trust_list: bool,
    pub contexts: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
    pub own: Option<OwnIdentityExtra>,
}

impl IdentityRow {
    /// Builds a freshly-discovered skeleton Identity (no document fetched
    /// yet); used by `engine::ops::add_identity`.
    pub fn skeleton(request_address: VersionedAddress, now: DateTime<Utc>) -> Self {
        IdentityRow {
            id: IdentityId::derive(&request_address),
            request_address,
            current_edition: 0,
            latest_edition_hint: 0,
            fetch_state: FetchState::NotFetched,
            last_fetched_at: None,
            last_changed_at: now,
            added_at: now,
            nickname: None,
            publishes_trust_list: false,
            contexts: BTreeSet::new(),
            properties: BTreeMap::new(),
            own: None,
        }
    }

    pub fn is_own(&self) -> bool {
        self.own.is_some()
    }

    /// Upgrades a plain Identity into an OwnIdentity, preserving every other
    /// field (`engine::ops::restore_own_identity`).
    pub fn upgrade_to_own(&mut self, insert_address: VersionedAddress, now: DateTime<Utc>) {
        self.own = Some(OwnIdentityExtra {
            insert_address,
            created_at: now,
            last_inserted_at: None,
        });
    }

    /// Whether a newer document should be fetched: a newer edition has been
    /// learned (`latest_edition_hint > current_edition`) or the identity was
    /// never fetched or explicitly reset (§4.3's fetch_state transitions).
    pub fn needs_refetch(&self) -> bool {
        matches!(self.fetch_state, FetchState::NotFetched)
            || self.latest_edition_hint > self.current_edition
    }

    /// `*` -> `NotFetched` on learning a strictly greater edition (§4.3).
    pub fn note_edition_hint(&mut self, edition: u64) {
        if edition > self.latest_edition_hint {
            self.latest_edition_hint = edition;
        }
        if edition > self.current_edition {
            self.fetch_state = FetchState::NotFetched;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::address::PublicKeyDigest;

    fn addr(edition: u64) -> VersionedAddress {
        VersionedAddress::Request { key: PublicKeyDigest([7u8; 32]), edition }
    }

    #[test]
    fn test_id_derivation_is_stable_across_editions() {
        let a = IdentityRow::skeleton(addr(0), Utc::now());
        let b = IdentityRow::skeleton(addr(5), Utc::now());
        assert_eq!(a.id, b.id, "id depends only on public key, not edition");
    }

    #[test]
    fn test_skeleton_is_not_own() {
        let row = IdentityRow::skeleton(addr(0), Utc::now());
        assert!(!row.is_own());
    }

    #[test]
    fn test_upgrade_to_own_sets_tag() {
        let mut row = IdentityRow::skeleton(addr(0), Utc::now());
        let insert = VersionedAddress::Insert {
            key: crate::graph::address::PrivateKeyDigest([1u8; 32]),
            public_key: PublicKeyDigest([7u8; 32]),
            edition: 0,
        };
        row.upgrade_to_own(insert, Utc::now());
        assert!(row.is_own());
    }

    #[test]
    fn test_greater_edition_resets_fetch_state() {
        let mut row = IdentityRow::skeleton(addr(0), Utc::now());
        row.fetch_state = FetchState::Fetched;
        row.current_edition = 3;
        row.note_edition_hint(9);
        assert_eq!(row.fetch_state, FetchState::NotFetched);
        assert_eq!(row.latest_edition_hint, 9);
    }

    #[test]
    fn test_lesser_edition_hint_is_ignored() {
        let mut row = IdentityRow::skeleton(addr(0), Utc::now());
        row.latest_edition_hint = 5;
        row.fetch_state = FetchState::Fetched;
        row.current_edition = 5;
        row.note_edition_hint(2);
        assert_eq!(row.latest_edition_hint, 5);
        assert_eq!(row.fetch_state, FetchState::Fetched);
    }
}
