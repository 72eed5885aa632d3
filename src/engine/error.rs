// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

use crate::{graph::IdentityId, persistence::StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown identity {0:?}")]
    UnknownIdentity(IdentityId),

    #[error("identity {0:?} already exists")]
    DuplicateIdentity(IdentityId),

    #[error("{truster:?} does not trust {trustee:?}")]
    NotTrusted { truster: IdentityId, trustee: IdentityId },

    #[error("{target:?} is not in {viewer:?}'s trust tree")]
    NotInTrustTree { viewer: IdentityId, target: IdentityId },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("trust {truster:?} -> {trustee:?} already exists")]
    DuplicateTrust { truster: IdentityId, trustee: IdentityId },

    #[error("score ({viewer:?}, {target:?}) already exists")]
    DuplicateScore { viewer: IdentityId, target: IdentityId },

    #[error("cascade did not converge")]
    CascadeDidNotConverge,

    #[error(transparent)]
    Storage(#[from] StoreError),
}
