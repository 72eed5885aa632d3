// SPDX-License-Identifier: AGPL-3.0-or-later

use core::fmt;

use serde::{Deserialize, Serialize};

/// Fixed-width digest of a public key, used as both the request-address key
/// material and the input to `IdentityId` derivation (I1: `id == H(public_key)`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKeyDigest(pub [u8; 32]);

impl fmt::Debug for PublicKeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyDigest({})", hex::encode(self.0))
    }
}

/// Fixed-width digest of a private (insert) key. Never derived from or
/// convertible into a `PublicKeyDigest` within this crate — signing and key
/// derivation are delegated to the network layer (§1, out of scope).
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyDigest(pub [u8; 32]);

impl fmt::Debug for PrivateKeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKeyDigest(<redacted>)")
    }
}

/// A versioned, edition-numbered network address (§6). Requests are public
/// and shareable; inserts are private and owned only by the local user.
///
/// Only the `Insert` variant can be converted to its corresponding `Request`
/// form (`to_request_form`) — the reverse direction does not exist, matching
/// §3's "must be convertible between the private 'insert' form (owned only)
/// and the public 'request' form" (one-directional: insert -> request).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VersionedAddress {
    Request { key: PublicKeyDigest, edition: u64 },
    Insert { key: PrivateKeyDigest, public_key: PublicKeyDigest, edition: u64 },
}

impl VersionedAddress {
    pub fn edition(&self) -> u64 {
        match self {
            VersionedAddress::Request { edition, .. } => *edition,
            VersionedAddress::Insert { edition, .. } => *edition,
        }
    }

    pub fn with_edition(&self, edition: u64) -> Self {
        match *self {
            VersionedAddress::Request { key, .. } => VersionedAddress::Request { key, edition },
            VersionedAddress::Insert { key, public_key, .. } => {
                VersionedAddress::Insert { key, public_key, edition }
            },
        }
    }

    /// Derives the public request form of an insert address. Only defined
    /// for `Insert`; `Request` has no further derivation available.
    pub fn to_request_form(&self) -> Option<VersionedAddress> {
        match self {
            VersionedAddress::Insert { public_key, edition, .. } => {
                Some(VersionedAddress::Request { key: *public_key, edition: *edition })
            },
            VersionedAddress::Request { .. } => None,
        }
    }

    pub fn public_key(&self) -> PublicKeyDigest {
        match self {
            VersionedAddress::Request { key, .. } => *key,
            VersionedAddress::Insert { public_key, .. } => *public_key,
        }
    }
}
