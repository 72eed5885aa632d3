// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use wot_engine::{
    engine::Engine,
    graph::{PrivateKeyDigest, PublicKeyDigest, VersionedAddress},
    persistence::Store,
};

/// A deterministic request address for identity `n`, distinct for every `n`.
pub fn request_addr(n: u8) -> VersionedAddress {
    VersionedAddress::Request { key: PublicKeyDigest([n; 32]), edition: 0 }
}

/// The matching insert address for `request_addr(n)`.
pub fn insert_addr(n: u8) -> VersionedAddress {
    VersionedAddress::Insert {
        key: PrivateKeyDigest([n; 32]),
        public_key: PublicKeyDigest([n; 32]),
        edition: 0,
    }
}

/// A fresh engine backed by a temporary on-disk store; the `TempDir` must
/// outlive the engine or the WAL directory is deleted out from under it.
pub fn fresh_engine() -> (Arc<Engine>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tmp dir");
    let store = Store::open(dir.path(), 500).expect("open store");
    (Arc::new(Engine::new(Arc::new(store))), dir)
}
