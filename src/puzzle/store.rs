// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    graph::{IdentityId, IntroductionPuzzle, PuzzleId},
    persistence::Store,
    puzzle::error::PuzzleError,
};

/// Owns the puzzle indexes declared on the shared object store
/// (`IntroductionPuzzle.id`, `.valid_until`, `.inserter`, §4.1) behind its
/// own coarse lock, acquired strictly after the engine lock (§5) by any
/// caller that needs both (e.g. `solve_puzzle`'s import-then-mark-solved
/// sequence).
pub struct PuzzleStore {
    store: Arc<Store>,
    lock: Mutex<()>,
}

impl PuzzleStore {
    pub fn new(store: Arc<Store>) -> Self {
        PuzzleStore { store, lock: Mutex::new(()) }
    }

    pub fn insert_puzzle(&self, puzzle: IntroductionPuzzle) -> Result<()> {
        let _guard = self.lock.lock();
        self.store.transaction(|txn| {
            if txn.state().puzzles.contains_key(&puzzle.id) {
                return Err(PuzzleError::DuplicatePuzzle(puzzle.id.clone()).into());
            }
            txn.state_mut().put_puzzle(puzzle);
            Ok(())
        })
    }

    pub fn get_puzzle(&self, id: &PuzzleId) -> Option<IntroductionPuzzle> {
        self.store.read(|state| state.puzzles.get(id).cloned())
    }

    /// Unsolved, unexpired puzzles from one inserter, for the client worker.
    pub fn unsolved_for_inserter(&self, inserter: IdentityId, now: DateTime<Utc>) -> Vec<IntroductionPuzzle> {
        self.store.read(|state| {
            state
                .idx_puzzle_by_inserter
                .get(&inserter)
                .into_iter()
                .flatten()
                .filter_map(|id| state.puzzles.get(id))
                .filter(|p| !p.is_solved() && !p.is_expired(now))
                .cloned()
                .collect()
        })
    }

    pub fn mark_solved(&self, id: &PuzzleId, solution: String, solver: IdentityId) -> Result<()> {
        let _guard = self.lock.lock();
        self.store.transaction(|txn| {
            let puzzle = txn
                .state_mut()
                .puzzles
                .get_mut(id)
                .ok_or_else(|| PuzzleError::UnknownPuzzle(id.clone()))?;
            puzzle.solution = Some(solution);
            puzzle.solved_by = Some(solver);
            Ok(())
        })
    }

    /// Deletes every puzzle with `expires_at < now` via the `valid_until`
    /// range index rather than a full table scan. Returns the count reaped.
    pub fn reap_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock.lock();
        self.store.transaction(|txn| {
            let expired: Vec<PuzzleId> = txn
                .state()
                .idx_puzzle_by_valid_until
                .range(..(now, PuzzleId(String::new())))
                .map(|((_, id), _)| id.clone())
                .collect();
            let count = expired.len();
            for id in &expired {
                txn.state_mut().delete_puzzle(id);
            }
            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn puzzle(id_byte: u8, expires_in: chrono::Duration) -> IntroductionPuzzle {
        let now = Utc::now();
        IntroductionPuzzle {
            id: PuzzleId(format!("p{id_byte}")),
            inserter: IdentityId([id_byte; 32]),
            payload: vec![1, 2, 3],
            mime_type: "image/png".to_string(),
            inserted_at: now,
            expires_at: now + expires_in,
            solution: None,
            solved_by: None,
        }
    }

    #[test]
    fn test_insert_then_duplicate_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Arc::new(Store::open(dir.path(), 500).expect("open"));
        let puzzles = PuzzleStore::new(store);
        let p = puzzle(1, chrono::Duration::days(1));
        puzzles.insert_puzzle(p.clone()).expect("first insert");
        assert!(puzzles.insert_puzzle(p).is_err());
    }

    #[test]
    fn test_reap_expired_removes_only_expired() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Arc::new(Store::open(dir.path(), 500).expect("open"));
        let puzzles = PuzzleStore::new(store);
        let fresh = puzzle(2, chrono::Duration::days(1));
        let stale = puzzle(3, chrono::Duration::seconds(-10));
        puzzles.insert_puzzle(fresh.clone()).expect("insert fresh");
        puzzles.insert_puzzle(stale.clone()).expect("insert stale");

        let reaped = puzzles.reap_expired(Utc::now()).expect("reap");
        assert_eq!(reaped, 1);
        assert!(puzzles.get_puzzle(&fresh.id).is_some());
        assert!(puzzles.get_puzzle(&stale.id).is_none());
    }

    #[test]
    fn test_unsolved_for_inserter_excludes_solved() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Arc::new(Store::open(dir.path(), 500).expect("open"));
        let puzzles = PuzzleStore::new(store);
        let mut p = puzzle(4, chrono::Duration::days(1));
        p.inserter = IdentityId([9u8; 32]);
        puzzles.insert_puzzle(p.clone()).expect("insert");
        puzzles.mark_solved(&p.id, "answer".to_string(), IdentityId([7u8; 32])).expect("solve");

        let unsolved = puzzles.unsolved_for_inserter(IdentityId([9u8; 32]), Utc::now());
        assert!(unsolved.is_empty());
    }
}
