// SPDX-License-Identifier: AGPL-3.0-or-later

mod common;

use common::{fresh_engine, insert_addr, request_addr};

/// Starting from the S1 linear chain, removing V -> A must cascade all the
/// way down the chain: A, B, and C all lose their Score once the only path
/// to any of them is gone.
#[tokio::test]
async fn removing_root_edge_clears_every_downstream_score() {
    let (engine, _dir) = fresh_engine();

    let v = engine.create_own_identity(request_addr(1), insert_addr(1)).await.expect("create v");
    let a = engine.add_identity(request_addr(2)).await.expect("add a");
    let b = engine.add_identity(request_addr(3)).await.expect("add b");
    let c = engine.add_identity(request_addr(4)).await.expect("add c");

    engine.set_trust(v, a, 100, None).await.expect("v->a");
    engine.set_trust(a, b, 100, None).await.expect("a->b");
    engine.set_trust(b, c, 100, None).await.expect("b->c");
    engine.read(|state| assert!(state.score(v, c).is_some(), "sanity: chain is connected"));

    engine.remove_trust(v, a).await.expect("remove v->a");

    engine.read(|state| {
        assert!(state.score(v, a).is_none());
        assert!(state.score(v, b).is_none());
        assert!(state.score(v, c).is_none());
    });
}
