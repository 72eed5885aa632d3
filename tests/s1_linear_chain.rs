// SPDX-License-Identifier: AGPL-3.0-or-later

mod common;

use common::{fresh_engine, insert_addr, request_addr};

/// Linear chain V -> A -> B -> C, all edges valued 100. Expected Scores in
/// V's tree: A{rank=1, capacity=40, value=100}, B{rank=2, capacity=16,
/// value=40}, C{rank=3, capacity=6, value=16}.
#[tokio::test]
async fn linear_chain_scores_decay_by_rank() {
    let (engine, _dir) = fresh_engine();

    let v = engine.create_own_identity(request_addr(1), insert_addr(1)).await.expect("create v");
    let a = engine.add_identity(request_addr(2)).await.expect("add a");
    let b = engine.add_identity(request_addr(3)).await.expect("add b");
    let c = engine.add_identity(request_addr(4)).await.expect("add c");

    engine.set_trust(v, a, 100, None).await.expect("v->a");
    engine.set_trust(a, b, 100, None).await.expect("a->b");
    engine.set_trust(b, c, 100, None).await.expect("b->c");

    engine.read(|state| {
        let score_a = state.score(v, a).expect("a score");
        assert_eq!((score_a.rank, score_a.capacity, score_a.value), (Some(1), 40, 100));

        let score_b = state.score(v, b).expect("b score");
        assert_eq!((score_b.rank, score_b.capacity, score_b.value), (Some(2), 16, 40));

        let score_c = state.score(v, c).expect("c score");
        assert_eq!((score_c.rank, score_c.capacity, score_c.value), (Some(3), 6, 16));
    });
}
