// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identity document wire format (§4.4).

pub mod document;
pub mod error;

pub use document::{decode, encode, ParsedDocument, TrustListEntry, CURRENT_VERSION};
pub use error::CodecError;
