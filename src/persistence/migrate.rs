// SPDX-License-Identifier: AGPL-3.0-or-later

//! One-shot, idempotent startup migration (§4.1.1). Currently a single
//! version bump; future schema changes add a match arm here rather than a
//! new entry point.

use anyhow::Result;

use crate::persistence::store::{Store, CURRENT_SCHEMA_VERSION};

/// Walks the store once inside a single transaction and brings its schema
/// tag up to `CURRENT_SCHEMA_VERSION`. A second call against an
/// already-current store is a no-op.
pub fn run(store: &Store) -> Result<()> {
    store.transaction(|txn| {
        let state = txn.state_mut();
        if state.schema_version < CURRENT_SCHEMA_VERSION {
            state.schema_version = CURRENT_SCHEMA_VERSION;
        }
        Ok(())
    })
}
