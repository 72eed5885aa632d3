// SPDX-License-Identifier: AGPL-3.0-or-later

mod common;

use common::{fresh_engine, insert_addr, request_addr};

/// Two independent viewers must never contaminate each other's tree: V1's
/// opinion of X says nothing about V2, and vice versa.
#[tokio::test]
async fn two_viewers_see_only_their_own_trustees() {
    let (engine, _dir) = fresh_engine();

    let v1 = engine.create_own_identity(request_addr(1), insert_addr(1)).await.expect("create v1");
    let v2 = engine.create_own_identity(request_addr(2), insert_addr(2)).await.expect("create v2");
    let x = engine.add_identity(request_addr(3)).await.expect("add x");
    let y = engine.add_identity(request_addr(4)).await.expect("add y");

    engine.set_trust(v1, x, 80, None).await.expect("v1->x");
    engine.set_trust(v2, y, 80, None).await.expect("v2->y");

    engine.read(|state| {
        let score_x = state.score(v1, x).expect("v1 sees x");
        assert_eq!(score_x.rank, Some(1));
        assert!(state.score(v1, y).is_none(), "v1 must not see y");

        let score_y = state.score(v2, y).expect("v2 sees y");
        assert_eq!(score_y.rank, Some(1));
        assert!(state.score(v2, x).is_none(), "v2 must not see x");
    });
}
