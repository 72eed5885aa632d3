// SPDX-License-Identifier: AGPL-3.0-or-later

//! Introduction puzzle server worker (§4.7): generates daily puzzles for
//! every `OwnIdentity` advertising the `"introduction"` context, uploads
//! them, polls for solutions, and trusts whoever solves one.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    engine::Engine,
    graph::{IdentityId, IntroductionPuzzle, PuzzleId, VersionedAddress},
    puzzle::store::PuzzleStore,
    utils::generate_nonce_hex,
};

pub const INTRODUCTION_CONTEXT: &str = "introduction";
const DEFAULT_PUZZLE_COUNT: u32 = 10;
const DEFAULT_TRUST_ON_SOLVE: i32 = 50;

#[derive(Debug, Error)]
pub enum IntroductionNetworkError {
    #[error("failed to upload puzzle: {0}")]
    Upload(String),
    #[error("failed to poll solution address: {0}")]
    Poll(String),
}

/// The out-of-scope network collaborator: puzzle upload and solution
/// polling at the deterministic addresses described in §6.
#[async_trait]
pub trait IntroductionNetwork: Send + Sync {
    async fn upload_puzzle(
        &self,
        inserter: IdentityId,
        day: NaiveDate,
        index: u32,
        puzzle: &IntroductionPuzzle,
    ) -> Result<(), IntroductionNetworkError>;

    /// Returns `Some((solution_text, solver_request_address))` once a
    /// solver has published to the puzzle's solution address.
    async fn poll_solution(
        &self,
        inserter: IdentityId,
        puzzle_id: &PuzzleId,
    ) -> Result<Option<(String, VersionedAddress)>, IntroductionNetworkError>;

    /// Client side of the handshake: uploads the solver's introduction
    /// document to the puzzle's solution address (§6's solution addressing).
    async fn upload_solution(
        &self,
        inserter: IdentityId,
        puzzle_id: &PuzzleId,
        solution: &str,
        solver_document: Vec<u8>,
    ) -> Result<(), IntroductionNetworkError>;
}

pub struct IntroductionServer {
    engine: Arc<Engine>,
    puzzles: Arc<PuzzleStore>,
    network: Arc<dyn IntroductionNetwork>,
    poll_interval: Duration,
    puzzle_validity: chrono::Duration,
}

impl IntroductionServer {
    pub fn new(
        engine: Arc<Engine>,
        puzzles: Arc<PuzzleStore>,
        network: Arc<dyn IntroductionNetwork>,
        poll_interval: Duration,
        puzzle_validity: chrono::Duration,
    ) -> Self {
        IntroductionServer { engine, puzzles, network, poll_interval, puzzle_validity }
    }

    fn introduction_inserters(&self) -> Vec<(IdentityId, u32)> {
        self.engine.read(|state| {
            state
                .identities
                .values()
                .filter(|row| row.is_own() && row.contexts.contains(INTRODUCTION_CONTEXT))
                .map(|row| {
                    let count = row
                        .properties
                        .get("IntroductionPuzzleCount")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(DEFAULT_PUZZLE_COUNT);
                    (row.id, count)
                })
                .collect()
        })
    }

    async fn generate_daily_puzzles(&self) {
        let today = Utc::now().date_naive();
        let now = Utc::now();
        for (inserter, count) in self.introduction_inserters() {
            for index in 0..count {
                let solution = generate_nonce_hex();
                let puzzle = IntroductionPuzzle {
                    id: PuzzleId::new(inserter),
                    inserter,
                    payload: solution.clone().into_bytes(),
                    mime_type: "text/plain".to_string(),
                    inserted_at: now,
                    expires_at: now + self.puzzle_validity,
                    solution: Some(solution),
                    solved_by: None,
                };
                if let Err(e) = self.network.upload_puzzle(inserter, today, index, &puzzle).await {
                    warn!(inserter = %inserter, error = %e, "puzzle upload failed");
                    continue;
                }
                if let Err(e) = self.puzzles.insert_puzzle(puzzle) {
                    warn!(inserter = %inserter, error = %e, "failed to record uploaded puzzle");
                }
            }
        }
    }

    async fn poll_for_solutions(&self) {
        let now = Utc::now();
        for (inserter, _) in self.introduction_inserters() {
            for puzzle in self.puzzles.unsolved_for_inserter(inserter, now) {
                match self.network.poll_solution(inserter, &puzzle.id).await {
                    Ok(Some((solution, solver_address))) => {
                        self.import_solver(inserter, &puzzle, solution, solver_address).await;
                    },
                    Ok(None) => {},
                    Err(e) => warn!(puzzle = ?puzzle.id, error = %e, "poll failed"),
                }
            }
        }
    }

    async fn import_solver(
        &self,
        inserter: IdentityId,
        puzzle: &IntroductionPuzzle,
        solution: String,
        solver_address: VersionedAddress,
    ) {
        if puzzle.solution.as_deref() != Some(solution.as_str()) {
            warn!(puzzle = ?puzzle.id, "solution mismatch, ignoring");
            return;
        }

        let solver_id = crate::graph::IdentityId::derive(&solver_address);
        let already_known = self.engine.read(|state| state.identities.contains_key(&solver_id));
        if !already_known {
            if let Err(e) = self.engine.add_identity(solver_address).await {
                warn!(solver = %solver_id, error = %e, "failed to import solver identity");
                return;
            }
        }

        if let Err(e) = self.engine.set_trust(inserter, solver_id, DEFAULT_TRUST_ON_SOLVE, None).await {
            warn!(solver = %solver_id, error = %e, "failed to trust solver after introduction");
            return;
        }

        if let Err(e) = self.puzzles.mark_solved(&puzzle.id, solution, solver_id) {
            warn!(puzzle = ?puzzle.id, error = %e, "failed to mark puzzle solved");
        }
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut last_daily_tick = None::<chrono::NaiveDate>;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("introduction server shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let today = Utc::now().date_naive();
            if last_daily_tick != Some(today) {
                self.generate_daily_puzzles().await;
                if let Err(e) = self.puzzles.reap_expired(Utc::now()) {
                    warn!(error = %e, "puzzle reap failed");
                }
                last_daily_tick = Some(today);
            }

            self.poll_for_solutions().await;
        }
    }
}
