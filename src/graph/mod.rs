// SPDX-License-Identifier: AGPL-3.0-or-later

//! The trust-graph data model: identities, trust edges, derived scores,
//! introduction puzzles, addressing, and field validation. No I/O or
//! locking lives here — that is `engine` and `persistence`.

pub mod address;
pub mod identity;
pub mod puzzle;
pub mod score;
pub mod trust;
pub mod validators;

pub use address::{PrivateKeyDigest, PublicKeyDigest, VersionedAddress};
pub use identity::{IdentityId, IdentityRow, OwnIdentityExtra};
pub use puzzle::{IntroductionPuzzle, PuzzleId};
pub use score::Score;
pub use trust::Trust;
