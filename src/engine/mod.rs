// SPDX-License-Identifier: AGPL-3.0-or-later

//! The trust graph engine: one coarse process-wide lock guarding a
//! transactional object store (§4.3, §4.3.1, §5).

pub mod capacity;
pub mod error;
pub mod ops;
pub mod recompute;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::{
    codec::document::ParsedDocument,
    graph::{IdentityId, VersionedAddress},
    persistence::Store,
};

pub use error::EngineError;

/// `Arc<Store>` plus the coarse graph lock named in §5. Every public
/// operation acquires the lock once for its full transaction and never
/// holds it across network I/O — the engine itself performs none.
pub struct Engine {
    store: Arc<Store>,
    lock: Mutex<()>,
}

impl Engine {
    pub fn new(store: Arc<Store>) -> Self {
        Engine { store, lock: Mutex::new(()) }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub async fn set_trust(
        &self,
        truster: IdentityId,
        trustee: IdentityId,
        value: i32,
        comment: Option<String>,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        ops::set_trust(&self.store, truster, trustee, value, comment)
    }

    pub async fn remove_trust(&self, truster: IdentityId, trustee: IdentityId) -> Result<()> {
        let _guard = self.lock.lock().await;
        ops::remove_trust(&self.store, truster, trustee)
    }

    pub async fn add_identity(&self, request_address: VersionedAddress) -> Result<IdentityId> {
        let _guard = self.lock.lock().await;
        ops::add_identity(&self.store, request_address)
    }

    pub async fn delete_identity(&self, id: IdentityId) -> Result<()> {
        let _guard = self.lock.lock().await;
        ops::delete_identity(&self.store, id)
    }

    pub async fn apply_document(&self, identity_id: IdentityId, doc: &ParsedDocument) -> Result<()> {
        let _guard = self.lock.lock().await;
        ops::apply_document(&self.store, identity_id, doc)
    }

    pub async fn create_own_identity(
        &self,
        request_address: VersionedAddress,
        insert_address: VersionedAddress,
    ) -> Result<IdentityId> {
        let _guard = self.lock.lock().await;
        ops::create_own_identity(&self.store, request_address, insert_address)
    }

    pub async fn restore_own_identity(
        &self,
        request_address: VersionedAddress,
        insert_address: VersionedAddress,
    ) -> Result<IdentityId> {
        let _guard = self.lock.lock().await;
        ops::restore_own_identity(&self.store, request_address, insert_address)
    }

    pub async fn mark_parsing_failed(&self, identity_id: IdentityId, edition: u64) -> Result<()> {
        let _guard = self.lock.lock().await;
        ops::mark_parsing_failed(&self.store, identity_id, edition)
    }

    pub async fn note_edition_hint(&self, identity_id: IdentityId, edition: u64) -> Result<()> {
        let _guard = self.lock.lock().await;
        ops::note_edition_hint(&self.store, identity_id, edition)
    }

    pub async fn record_insert_success(&self, id: IdentityId, edition: u64) -> Result<()> {
        let _guard = self.lock.lock().await;
        ops::record_insert_success(&self.store, id, edition)
    }

    /// Read-only helper used by workers to build a candidate list without
    /// taking the write lock (§4.5.1's "acquire engine lock just long enough
    /// to build today's candidate list" applies to the *read*, which never
    /// needs the coarse lock since `Store::read` is already consistent).
    pub fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&crate::persistence::StoreInner) -> T,
    {
        self.store.read(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PublicKeyDigest;

    #[tokio::test]
    async fn test_add_identity_is_visible_to_read() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Arc::new(Store::open(dir.path(), 500).expect("open"));
        let engine = Engine::new(store);
        let addr = VersionedAddress::Request { key: PublicKeyDigest([5u8; 32]), edition: 0 };
        let id = engine.add_identity(addr).await.expect("add");
        engine.read(|state| assert!(state.identities.contains_key(&id)));
    }
}
