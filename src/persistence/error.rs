// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

/// Errors raised by the object store itself (as opposed to errors raised by
/// a transaction closure's own business logic, which travel as `anyhow::Error`
/// through `Store::transaction`'s `Result<T>`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("wal record corrupt or truncated at offset {offset}")]
    WalCorrupt { offset: u64 },

    #[error("failed to encode/decode store snapshot: {0}")]
    Codec(#[from] Box<bincode::ErrorKind>),
}
