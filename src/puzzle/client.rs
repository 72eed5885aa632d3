// SPDX-License-Identifier: AGPL-3.0-or-later

//! Introduction puzzle client worker (§4.7): maintains a pool of unsolved
//! puzzles from identities the viewer already trusts, and carries out a
//! user-chosen solve.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    engine::Engine,
    graph::{IdentityId, IntroductionPuzzle, PuzzleId},
    puzzle::{server::INTRODUCTION_CONTEXT, server::IntroductionNetwork, store::PuzzleStore},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown puzzle {0:?}")]
    UnknownPuzzle(PuzzleId),
    #[error("puzzle {0:?} belongs to a different inserter than expected")]
    WrongInserter(PuzzleId),
    #[error(transparent)]
    Network(#[from] crate::puzzle::server::IntroductionNetworkError),
}

pub struct IntroductionClient {
    engine: Arc<Engine>,
    puzzles: Arc<PuzzleStore>,
    network: Arc<dyn IntroductionNetwork>,
    pool_target: usize,
    max_puzzles_per_identity: usize,
    poll_interval: Duration,
    recent_inserters: Mutex<LruCache<IdentityId, ()>>,
    presented_this_session: DashMap<IdentityId, usize>,
}

impl IntroductionClient {
    pub fn new(
        engine: Arc<Engine>,
        puzzles: Arc<PuzzleStore>,
        network: Arc<dyn IntroductionNetwork>,
        pool_target: usize,
        max_puzzles_per_identity: usize,
        inserter_lru_capacity: usize,
        poll_interval: Duration,
    ) -> Self {
        let capacity = std::num::NonZeroUsize::new(inserter_lru_capacity.max(1)).expect("capacity > 0");
        IntroductionClient {
            engine,
            puzzles,
            network,
            pool_target,
            max_puzzles_per_identity,
            poll_interval,
            recent_inserters: Mutex::new(LruCache::new(capacity)),
            presented_this_session: DashMap::new(),
        }
    }

    /// Candidate inserters for `viewer`: identities with the `"introduction"`
    /// context and a positive Score in the viewer's tree, ordered to prefer
    /// inserters not recently drawn from (LRU-least-recent first).
    fn candidate_inserters(&self, viewer: IdentityId) -> Vec<IdentityId> {
        let mut candidates: Vec<IdentityId> = self.engine.read(|state| {
            state
                .identities
                .values()
                .filter(|row| row.contexts.contains(INTRODUCTION_CONTEXT))
                .filter(|row| state.score(viewer, row.id).map(|s| s.value > 0).unwrap_or(false))
                .map(|row| row.id)
                .collect()
        });

        let lru = self.recent_inserters.lock();
        candidates.sort_by_key(|id| if lru.contains(id) { 1 } else { 0 });
        candidates
    }

    /// Refreshes the pool of presentable puzzles for `viewer`, respecting
    /// `max_puzzles_per_identity` and `pool_target`.
    pub fn refresh_pool(&self, viewer: IdentityId) -> Vec<IntroductionPuzzle> {
        let now = Utc::now();
        let mut pool = Vec::new();

        for inserter in self.candidate_inserters(viewer) {
            if pool.len() >= self.pool_target {
                break;
            }
            let presented = self.presented_this_session.get(&inserter).map(|c| *c).unwrap_or(0);
            if presented >= self.max_puzzles_per_identity {
                continue;
            }

            let available = self.puzzles.unsolved_for_inserter(inserter, now);
            let take = available
                .into_iter()
                .take((self.max_puzzles_per_identity - presented).min(self.pool_target - pool.len()));

            let mut drew_any = false;
            for puzzle in take {
                pool.push(puzzle);
                drew_any = true;
            }
            if drew_any {
                *self.presented_this_session.entry(inserter).or_insert(0) += 1;
                self.recent_inserters.lock().put(inserter, ());
            }
        }

        pool
    }

    /// Carries out a user-chosen solve: uploads the solver's introduction
    /// document to the puzzle's solution address.
    pub async fn solve_puzzle(
        &self,
        puzzle_id: &PuzzleId,
        solution: String,
        solver_document: Vec<u8>,
    ) -> Result<(), ClientError> {
        let puzzle = self.puzzles.get_puzzle(puzzle_id).ok_or_else(|| ClientError::UnknownPuzzle(puzzle_id.clone()))?;
        self.network
            .upload_solution(puzzle.inserter, puzzle_id, &solution, solver_document)
            .await?;
        Ok(())
    }

    /// Periodic pool maintenance for every `OwnIdentity` (§4.7's "each
    /// cycle" client behavior).
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("introduction client shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let viewers: Vec<IdentityId> =
                self.engine.read(|state| state.identities.values().filter(|r| r.is_own()).map(|r| r.id).collect());
            for viewer in viewers {
                let pool = self.refresh_pool(viewer);
                if pool.is_empty() {
                    warn!(%viewer, "no introduction puzzles available this cycle");
                }
            }
        }
    }
}
