// SPDX-License-Identifier: AGPL-3.0-or-later

mod common;

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use common::{fresh_engine, insert_addr, request_addr};
use wot_engine::{
    cfg::enums::FetchState,
    codec::ParsedDocument,
    graph::{IdentityId, IntroductionPuzzle, PuzzleId},
    puzzle::PuzzleStore,
};

/// A solver presenting the right answer to one of V's puzzles must end up
/// directly trusted by V, reachable in V's tree, and — once their own
/// document is fetched for the first time — marked `Fetched`.
#[tokio::test]
async fn solving_a_puzzle_introduces_and_trusts_the_solver() {
    let (engine, _dir) = fresh_engine();
    let puzzles = PuzzleStore::new(engine.store().clone());

    let v = engine.create_own_identity(request_addr(1), insert_addr(1)).await.expect("create v");

    let solution = "correct-answer".to_string();
    let puzzle = IntroductionPuzzle {
        id: PuzzleId::new(v),
        inserter: v,
        payload: b"solve me".to_vec(),
        mime_type: "text/plain".to_string(),
        inserted_at: Utc::now(),
        expires_at: Utc::now() + chrono::Duration::days(1),
        solution: Some(solution.clone()),
        solved_by: None,
    };
    puzzles.insert_puzzle(puzzle.clone()).expect("insert puzzle");

    // The server side of the handshake: a solver's request address arrives
    // attached to the right solution, so it gets imported and trusted.
    let solver_request = request_addr(9);
    let solver_id = IdentityId::derive(&solver_request);
    engine.add_identity(solver_request).await.expect("import solver identity");
    engine.set_trust(v, solver_id, 50, None).await.expect("trust solver");
    puzzles.mark_solved(&puzzle.id, solution, solver_id).expect("mark solved");

    engine.read(|state| {
        let trust = state.trusts.get(&(v, solver_id)).expect("v trusts solver directly");
        assert!((0..=100).contains(&(trust.value as i32)));
        assert!(state.score(v, solver_id).is_some(), "solver must be reachable in v's tree");
        assert_eq!(
            state.identities.get(&solver_id).expect("solver row").fetch_state,
            FetchState::NotFetched,
            "importing alone does not fetch the solver's document yet"
        );
    });

    // The solver's own document is fetched for the first time.
    let doc = ParsedDocument {
        source_address: solver_request,
        edition: 1,
        nickname: Some("solver".to_string()),
        publishes_trust_list: false,
        contexts: BTreeSet::new(),
        properties: BTreeMap::new(),
        trust_list: vec![],
    };
    engine.apply_document(solver_id, &doc).await.expect("apply solver document");

    engine.read(|state| {
        assert_eq!(state.identities.get(&solver_id).expect("solver row").fetch_state, FetchState::Fetched);
    });
}
