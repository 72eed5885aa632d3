// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    path::Path,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    graph::{IdentityId, IdentityRow, IntroductionPuzzle, PuzzleId, Score, Trust},
    persistence::wal::Wal,
};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// The full in-memory state of the object store: one table per entity kind,
/// each paired with the secondary indexes §4.1 declares for it. This whole
/// struct is what gets cloned into a `Txn`'s staging area and what gets
/// bincode-encoded as one WAL record (§4.1.1).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreInner {
    pub schema_version: u32,

    pub identities: HashMap<IdentityId, IdentityRow>,
    pub idx_identity_by_last_fetched_at: BTreeMap<(DateTime<Utc>, IdentityId), ()>,

    pub trusts: HashMap<(IdentityId, IdentityId), Trust>,
    pub idx_trust_by_truster: BTreeMap<IdentityId, BTreeSet<IdentityId>>,
    pub idx_trust_by_trustee: BTreeMap<IdentityId, BTreeSet<IdentityId>>,

    pub scores: HashMap<(IdentityId, IdentityId), Score>,
    pub idx_score_by_viewer: BTreeMap<IdentityId, BTreeSet<IdentityId>>,
    pub idx_score_by_target: BTreeMap<IdentityId, BTreeSet<IdentityId>>,

    pub puzzles: HashMap<PuzzleId, IntroductionPuzzle>,
    pub idx_puzzle_by_inserter: BTreeMap<IdentityId, BTreeSet<PuzzleId>>,
    pub idx_puzzle_by_valid_until: BTreeMap<(DateTime<Utc>, PuzzleId), ()>,
}

impl StoreInner {
    pub fn empty() -> Self {
        StoreInner { schema_version: CURRENT_SCHEMA_VERSION, ..Default::default() }
    }

    pub fn put_identity(&mut self, row: IdentityRow) {
        if let Some(old) = self.identities.get(&row.id) {
            if let Some(t) = old.last_fetched_at {
                self.idx_identity_by_last_fetched_at.remove(&(t, old.id));
            }
        }
        if let Some(t) = row.last_fetched_at {
            self.idx_identity_by_last_fetched_at.insert((t, row.id), ());
        }
        self.identities.insert(row.id, row);
    }

    pub fn delete_identity(&mut self, id: IdentityId) -> Option<IdentityRow> {
        let row = self.identities.remove(&id)?;
        if let Some(t) = row.last_fetched_at {
            self.idx_identity_by_last_fetched_at.remove(&(t, id));
        }
        Some(row)
    }

    pub fn put_trust(&mut self, trust: Trust) {
        let key = (trust.truster, trust.trustee);
        self.idx_trust_by_truster.entry(trust.truster).or_default().insert(trust.trustee);
        self.idx_trust_by_trustee.entry(trust.trustee).or_default().insert(trust.truster);
        self.trusts.insert(key, trust);
    }

    pub fn delete_trust(&mut self, truster: IdentityId, trustee: IdentityId) -> Option<Trust> {
        let removed = self.trusts.remove(&(truster, trustee))?;
        if let Some(set) = self.idx_trust_by_truster.get_mut(&truster) {
            set.remove(&trustee);
            if set.is_empty() {
                self.idx_trust_by_truster.remove(&truster);
            }
        }
        if let Some(set) = self.idx_trust_by_trustee.get_mut(&trustee) {
            set.remove(&truster);
            if set.is_empty() {
                self.idx_trust_by_trustee.remove(&trustee);
            }
        }
        Some(removed)
    }

    pub fn trustees_of(&self, truster: IdentityId) -> impl Iterator<Item = &IdentityId> {
        self.idx_trust_by_truster.get(&truster).into_iter().flatten()
    }

    pub fn trusters_of(&self, trustee: IdentityId) -> impl Iterator<Item = &IdentityId> {
        self.idx_trust_by_trustee.get(&trustee).into_iter().flatten()
    }

    pub fn put_score(&mut self, score: Score) {
        let key = (score.viewer, score.target);
        self.idx_score_by_viewer.entry(score.viewer).or_default().insert(score.target);
        self.idx_score_by_target.entry(score.target).or_default().insert(score.viewer);
        self.scores.insert(key, score);
    }

    pub fn delete_score(&mut self, viewer: IdentityId, target: IdentityId) -> Option<Score> {
        let removed = self.scores.remove(&(viewer, target))?;
        if let Some(set) = self.idx_score_by_viewer.get_mut(&viewer) {
            set.remove(&target);
            if set.is_empty() {
                self.idx_score_by_viewer.remove(&viewer);
            }
        }
        if let Some(set) = self.idx_score_by_target.get_mut(&target) {
            set.remove(&viewer);
            if set.is_empty() {
                self.idx_score_by_target.remove(&target);
            }
        }
        Some(removed)
    }

    pub fn score(&self, viewer: IdentityId, target: IdentityId) -> Option<&Score> {
        self.scores.get(&(viewer, target))
    }

    pub fn put_puzzle(&mut self, puzzle: IntroductionPuzzle) {
        self.idx_puzzle_by_inserter.entry(puzzle.inserter).or_default().insert(puzzle.id.clone());
        self.idx_puzzle_by_valid_until.insert((puzzle.expires_at, puzzle.id.clone()), ());
        self.puzzles.insert(puzzle.id.clone(), puzzle);
    }

    pub fn delete_puzzle(&mut self, id: &PuzzleId) -> Option<IntroductionPuzzle> {
        let removed = self.puzzles.remove(id)?;
        if let Some(set) = self.idx_puzzle_by_inserter.get_mut(&removed.inserter) {
            set.remove(id);
            if set.is_empty() {
                self.idx_puzzle_by_inserter.remove(&removed.inserter);
            }
        }
        self.idx_puzzle_by_valid_until.remove(&(removed.expires_at, id.clone()));
        Some(removed)
    }
}

/// A staging area for one unit of work. Mutations apply only to this cloned
/// copy of the live state; `Store::transaction` swaps it in on success and
/// discards it otherwise, giving commit/rollback without an external engine.
pub struct Txn<'s> {
    store: &'s Store,
    staged: StoreInner,
}

impl<'s> Txn<'s> {
    pub fn state(&self) -> &StoreInner {
        &self.staged
    }

    pub fn state_mut(&mut self) -> &mut StoreInner {
        &mut self.staged
    }

    pub fn store(&self) -> &Store {
        self.store
    }
}

pub struct Store {
    inner: RwLock<StoreInner>,
    wal: Wal,
    compact_every_n_txns: u64,
    committed_since_compaction: RwLock<u64>,
}

impl Store {
    /// Opens (or creates) the store at `data_dir`, replaying the WAL to
    /// rebuild state.
    pub fn open<P: AsRef<Path>>(data_dir: P, compact_every_n_txns: u64) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        let wal_path = data_dir.as_ref().join("wot.wal");
        let wal = Wal::open(&wal_path)?;
        let inner = wal.replay()?.unwrap_or_else(StoreInner::empty);
        Ok(Store {
            inner: RwLock::new(inner),
            wal,
            compact_every_n_txns: compact_every_n_txns.max(1),
            committed_since_compaction: RwLock::new(0),
        })
    }

    /// Read-only snapshot access for callers that don't need a transaction
    /// (e.g. RPC read operations, §4.3's read side).
    pub fn read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&StoreInner) -> T,
    {
        let guard = self.inner.read();
        f(&guard)
    }

    /// Sole write entry point (§4.1.1). `f` mutates a private staging copy;
    /// an `Err` return (or a panic unwound through `Drop`) leaves the live
    /// state untouched.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Txn) -> Result<T>,
    {
        let snapshot = self.inner.read().clone();
        let mut txn = Txn { store: self, staged: snapshot };
        let result = f(&mut txn)?;
        let staged = txn.staged;

        {
            let mut guard = self.inner.write();
            *guard = staged.clone();
        }
        self.wal.append(&staged)?;

        let mut count = self.committed_since_compaction.write();
        *count += 1;
        if *count >= self.compact_every_n_txns {
            self.wal.compact(&staged)?;
            *count = 0;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn id(b: u8) -> IdentityId {
        IdentityId([b; 32])
    }

    #[test]
    fn test_rollback_on_err_leaves_state_untouched() {
        let dir = tempdir().expect("tmp dir");
        let store = Store::open(dir.path(), 500).expect("open");
        let row = IdentityRow::skeleton(
            crate::graph::VersionedAddress::Request {
                key: crate::graph::PublicKeyDigest([1u8; 32]),
                edition: 0,
            },
            Utc::now(),
        );
        let target_id = row.id;
        let result: Result<()> = store.transaction(|txn| {
            txn.state_mut().put_identity(row.clone());
            anyhow::bail!("forced rollback")
        });
        assert!(result.is_err());
        store.read(|state| assert!(!state.identities.contains_key(&target_id)));
    }

    #[test]
    fn test_commit_is_visible_after_transaction() {
        let dir = tempdir().expect("tmp dir");
        let store = Store::open(dir.path(), 500).expect("open");
        let row = IdentityRow::skeleton(
            crate::graph::VersionedAddress::Request {
                key: crate::graph::PublicKeyDigest([2u8; 32]),
                edition: 0,
            },
            Utc::now(),
        );
        let target_id = row.id;
        store
            .transaction(|txn| {
                txn.state_mut().put_identity(row.clone());
                Ok(())
            })
            .expect("commit");
        store.read(|state| assert!(state.identities.contains_key(&target_id)));
    }

    #[test]
    fn test_trust_indexes_stay_consistent_on_delete() {
        let mut state = StoreInner::empty();
        let t = Trust::new(id(1), id(2), 50, None, Utc::now());
        state.put_trust(t);
        assert_eq!(state.trustees_of(id(1)).count(), 1);
        state.delete_trust(id(1), id(2));
        assert_eq!(state.trustees_of(id(1)).count(), 0);
        assert!(state.idx_trust_by_truster.get(&id(1)).is_none());
    }

    #[test]
    fn test_reopen_replays_wal() {
        let dir = tempdir().expect("tmp dir");
        let row = IdentityRow::skeleton(
            crate::graph::VersionedAddress::Request {
                key: crate::graph::PublicKeyDigest([3u8; 32]),
                edition: 0,
            },
            Utc::now(),
        );
        let target_id = row.id;
        {
            let store = Store::open(dir.path(), 500).expect("open");
            store
                .transaction(|txn| {
                    txn.state_mut().put_identity(row.clone());
                    Ok(())
                })
                .expect("commit");
        }
        let reopened = Store::open(dir.path(), 500).expect("reopen");
        reopened.read(|state| assert!(state.identities.contains_key(&target_id)));
    }
}
