// SPDX-License-Identifier: AGPL-3.0-or-later

mod common;

use common::{fresh_engine, insert_addr, request_addr};
use wot_engine::{cfg::enums::FetchState, codec};

/// A document whose declared trust-list length exceeds the bound must be
/// rejected before any edit lands, and recording the failed attempt must
/// only touch `fetch_state`/`current_edition` — never the trust graph or
/// any previously-computed Score.
#[tokio::test]
async fn oversized_trust_list_is_rejected_without_touching_scores() {
    let (engine, _dir) = fresh_engine();

    let v = engine.create_own_identity(request_addr(1), insert_addr(1)).await.expect("create v");
    let a = engine.add_identity(request_addr(2)).await.expect("add a");
    engine.set_trust(v, a, 100, None).await.expect("v->a");

    let before = engine.read(|state| state.score(v, a).cloned()).expect("a has a score before");

    let oversized = format!(
        "Version=1\0PublishesTrustList=No\0TrustListLen={}\0",
        codec::document::MAX_TRUST_LIST_LEN + 1
    )
    .into_bytes();
    let edition = 7u64;
    let err = codec::decode(&oversized, request_addr(2), edition).expect_err("must reject oversized list");
    assert!(matches!(err, codec::CodecError::TrustListTooLarge { .. }));

    engine.mark_parsing_failed(a, edition).await.expect("record parsing failure");

    engine.read(|state| {
        let row = state.identities.get(&a).expect("a row");
        assert_eq!(row.fetch_state, FetchState::ParsingFailed);
        assert_eq!(row.current_edition, edition);
        assert_eq!(state.score(v, a), Some(&before), "prior score must be untouched");
    });
}
