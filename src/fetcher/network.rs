// SPDX-License-Identifier: AGPL-3.0-or-later

use async_trait::async_trait;
use thiserror::Error;

use crate::graph::VersionedAddress;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient network failure fetching {address:?} edition {edition}: {reason}")]
    Transient { address: VersionedAddress, edition: u64, reason: String },

    /// The network learned of a later edition than the one requested.
    #[error("edition {requested} superseded by {latest} at {address:?}")]
    NewerEditionExists { address: VersionedAddress, requested: u64, latest: u64 },
}

/// The out-of-scope network collaborator (§1): fetches raw document bytes
/// for a request address at a given edition. Injected as a trait object so
/// the fetcher supervisor can be tested without a real network.
#[async_trait]
pub trait FetchNetwork: Send + Sync {
    async fn fetch(&self, address: VersionedAddress, edition: u64) -> Result<Vec<u8>, FetchError>;
}
