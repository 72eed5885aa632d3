// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

use crate::graph::IdentityId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("unsupported document version {found} (max {max})")]
    UnsupportedVersion { found: u32, max: u32 },

    #[error("field {field} is too long: limit {limit}, actual {actual}")]
    FieldTooLong { field: &'static str, limit: usize, actual: usize },

    #[error("field {field} contains an illegal character in {value:?}")]
    IllegalCharacter { field: &'static str, value: String },

    #[error("trust list contains {0:?} more than once")]
    DuplicateTrustee(IdentityId),

    #[error("trust list too large: limit {limit}, actual {actual}")]
    TrustListTooLarge { limit: usize, actual: usize },

    #[error("malformed document: {0}")]
    Malformed(String),
}
