// SPDX-License-Identifier: AGPL-3.0-or-later

//! The local RPC facade (§4.8, §6): a plain `async fn`-per-operation type
//! wrapping `Arc<Engine>` and `Arc<PuzzleStore>`/`Arc<IntroductionClient>`,
//! grounded on the reference's `Pool` facade shape. The wire transport that
//! would carry these calls to a remote UI process is out of scope.

use std::sync::Arc;

use anyhow::Result;

use crate::{
    cfg::enums::ScoreSign,
    codec,
    engine::Engine,
    graph::{IdentityId, IntroductionPuzzle, PuzzleId, VersionedAddress},
    puzzle::{client::IntroductionClient, store::PuzzleStore},
};

pub struct IdentityScore {
    pub identity: IdentityId,
    pub rank: Option<u32>,
    pub capacity: u8,
    pub value: i32,
}

pub struct Facade {
    engine: Arc<Engine>,
    puzzles: Arc<PuzzleStore>,
    introduction_client: Arc<IntroductionClient>,
}

impl Facade {
    pub fn new(
        engine: Arc<Engine>,
        puzzles: Arc<PuzzleStore>,
        introduction_client: Arc<IntroductionClient>,
    ) -> Self {
        Facade { engine, puzzles, introduction_client }
    }

    pub async fn create_own_identity(
        &self,
        request_address: VersionedAddress,
        insert_address: VersionedAddress,
    ) -> Result<IdentityId> {
        self.engine.create_own_identity(request_address, insert_address).await
    }

    pub async fn restore_own_identity(
        &self,
        request_address: VersionedAddress,
        insert_address: VersionedAddress,
    ) -> Result<IdentityId> {
        self.engine.restore_own_identity(request_address, insert_address).await
    }

    pub async fn delete_identity(&self, id: IdentityId) -> Result<()> {
        self.engine.delete_identity(id).await
    }

    pub async fn set_trust(
        &self,
        truster: IdentityId,
        trustee: IdentityId,
        value: i32,
        comment: Option<String>,
    ) -> Result<()> {
        self.engine.set_trust(truster, trustee, value, comment).await
    }

    pub async fn remove_trust(&self, truster: IdentityId, trustee: IdentityId) -> Result<()> {
        self.engine.remove_trust(truster, trustee).await
    }

    pub async fn add_identity(&self, request_address: VersionedAddress) -> Result<IdentityId> {
        self.engine.add_identity(request_address).await
    }

    /// `get_identities_by_score(viewer, sign, context_filter)` (§6).
    pub fn get_identities_by_score(
        &self,
        viewer: IdentityId,
        sign: ScoreSign,
        context_filter: Option<&str>,
    ) -> Vec<IdentityScore> {
        self.engine.read(|state| {
            state
                .idx_score_by_viewer
                .get(&viewer)
                .into_iter()
                .flatten()
                .filter_map(|target| state.score(viewer, *target).map(|s| (*target, s)))
                .filter(|(_, score)| sign.matches(score.value))
                .filter(|(target, _)| match context_filter {
                    Some(ctx) => {
                        state.identities.get(target).map(|row| row.contexts.contains(ctx)).unwrap_or(false)
                    },
                    None => true,
                })
                .map(|(target, score)| IdentityScore {
                    identity: target,
                    rank: score.rank,
                    capacity: score.capacity,
                    value: score.value,
                })
                .collect()
        })
    }

    /// `get_puzzles(viewer, type, count)` (§6); `puzzle_type` filters by
    /// MIME type, matching every puzzle when omitted.
    pub fn get_puzzles(
        &self,
        viewer: IdentityId,
        puzzle_type: Option<&str>,
        count: usize,
    ) -> Vec<IntroductionPuzzle> {
        self.introduction_client
            .refresh_pool(viewer)
            .into_iter()
            .filter(|p| puzzle_type.map(|t| p.mime_type == t).unwrap_or(true))
            .take(count)
            .collect()
    }

    /// `solve_puzzle(viewer, puzzle_id, solution)` (§6): uploads the
    /// viewer's own introduction document to the puzzle's solution address.
    pub async fn solve_puzzle(
        &self,
        viewer: IdentityId,
        puzzle_id: PuzzleId,
        solution: String,
    ) -> Result<()> {
        if self.puzzles.get_puzzle(&puzzle_id).is_none() {
            return Err(crate::puzzle::PuzzleError::UnknownPuzzle(puzzle_id).into());
        }
        let doc = crate::engine::ops::build_outgoing_document(self.engine.store(), viewer)
            .ok_or_else(|| anyhow::anyhow!("unknown viewer identity {viewer:?}"))?;
        let encoded = codec::encode(&doc);
        self.introduction_client.solve_puzzle(&puzzle_id, solution, encoded).await?;
        Ok(())
    }
}
