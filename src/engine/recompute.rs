// SPDX-License-Identifier: AGPL-3.0-or-later

//! Phase B/C of §4.3: per-(viewer, target) score recomputation and the
//! cascade that follows a capacity change.

use std::collections::{HashSet, VecDeque};

use anyhow::Result;

use crate::{
    engine::capacity::{capacity_for_rank, CAPACITY_TABLE},
    graph::{IdentityId, Score},
    persistence::Txn,
};

/// Effective (rank, capacity) of `node` as seen from `viewer`'s tree. The
/// viewer is rank 0, capacity 100 (never stored, P8); anything else without
/// a stored Score is unreachable (rank None, capacity 0).
fn effective(txn: &Txn, viewer: IdentityId, node: IdentityId) -> (Option<u32>, u8) {
    if node == viewer {
        return (Some(0), 100);
    }
    match txn.state().score(viewer, node) {
        Some(score) => (score.rank, score.capacity),
        None => (None, 0),
    }
}

/// Recomputes `Score(viewer, target)` per §4.3 step 1-3. Returns whether the
/// stored capacity changed (the cascade trigger for Phase C); never stores
/// or reports a change for `target == viewer` (P8).
pub fn recompute_one(txn: &mut Txn, viewer: IdentityId, target: IdentityId) -> Result<bool> {
    if target == viewer {
        return Ok(false);
    }

    let trusters: Vec<IdentityId> = txn.state().trusters_of(target).copied().collect();

    let mut best_rank: Option<u32> = None;
    for &t in &trusters {
        let (rank, cap) = effective(txn, viewer, t);
        if cap == 0 {
            continue;
        }
        if let Some(r) = rank {
            best_rank = Some(best_rank.map_or(r, |b| b.min(r)));
        }
    }

    let old = txn.state().score(viewer, target).cloned();
    let old_capacity = old.as_ref().map(|s| s.capacity).unwrap_or(0);

    let Some(min_rank) = best_rank else {
        if old.is_some() {
            txn.state_mut().delete_score(viewer, target);
            return Ok(old_capacity != 0);
        }
        return Ok(false);
    };

    let rank = min_rank + 1;

    let mut value: i64 = 0;
    for &t in &trusters {
        let trust = txn
            .state()
            .trusts
            .get(&(t, target))
            .expect("trusters_of only yields trusters with a live Trust row");
        let (_, cap) = effective(txn, viewer, t);
        value += (trust.value as i64) * (cap as i64) / 100;
    }
    let value = value.clamp(i32::MIN as i64, i32::MAX as i64) as i32;

    let viewer_direct_negative = txn
        .state()
        .trusts
        .get(&(viewer, target))
        .map(|t| t.value < 0)
        .unwrap_or(false);

    let capacity = if viewer_direct_negative {
        0
    } else if rank as usize >= CAPACITY_TABLE.len() {
        1
    } else {
        capacity_for_rank(rank)
    };

    let old_value = old.as_ref().map(|s| s.value).unwrap_or(0);
    txn.state_mut().put_score(Score { viewer, target, rank: Some(rank), capacity, value });

    if old_value <= 0 && value > 0 {
        mark_for_refetch(txn, target);
    }

    Ok(capacity != old_capacity)
}

/// `Fetched -> NotFetched` when a Score crosses from `<= 0` to `> 0`:
/// trustees of a previously-untrusted identity were never materialized, so
/// its document must be re-examined (§4.3's fetch_state state machine).
fn mark_for_refetch(txn: &mut Txn, target: IdentityId) {
    if let Some(row) = txn.state_mut().identities.get_mut(&target) {
        if row.fetch_state == crate::cfg::enums::FetchState::Fetched {
            row.fetch_state = crate::cfg::enums::FetchState::NotFetched;
        }
    }
}

/// Phase B + Phase C: recomputes every `(viewer, target)` pair for `target`
/// in `initial_targets` across every `OwnIdentity`'s tree, cascading to
/// direct trustees whenever a capacity change is observed, until the queue
/// drains (§4.3's termination argument: capacity is bounded and monotone
/// within one transaction).
pub fn reconcile(txn: &mut Txn, initial_targets: &[IdentityId]) -> Result<()> {
    let viewers: Vec<IdentityId> =
        txn.state().identities.values().filter(|row| row.is_own()).map(|row| row.id).collect();

    for viewer in viewers {
        let mut queue: VecDeque<IdentityId> = VecDeque::new();
        let mut queued: HashSet<IdentityId> = HashSet::new();
        for &target in initial_targets {
            if target != viewer && queued.insert(target) {
                queue.push_back(target);
            }
        }

        while let Some(target) = queue.pop_front() {
            queued.remove(&target);
            let changed = recompute_one(txn, viewer, target)?;
            if changed {
                let trustees: Vec<IdentityId> = txn.state().trustees_of(target).copied().collect();
                for t in trustees {
                    if t != viewer && queued.insert(t) {
                        queue.push_back(t);
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{
        graph::{IdentityRow, PublicKeyDigest, Trust, VersionedAddress},
        persistence::Store,
    };

    fn id(b: u8) -> IdentityId {
        IdentityId([b; 32])
    }

    fn own_row(n: u8) -> IdentityRow {
        let mut row = IdentityRow::skeleton(
            VersionedAddress::Request { key: PublicKeyDigest([n; 32]), edition: 0 },
            Utc::now(),
        );
        row.upgrade_to_own(
            VersionedAddress::Insert {
                key: crate::graph::PrivateKeyDigest([n; 32]),
                public_key: PublicKeyDigest([n; 32]),
                edition: 0,
            },
            Utc::now(),
        );
        row
    }

    fn remote_row(n: u8) -> IdentityRow {
        IdentityRow::skeleton(
            VersionedAddress::Request { key: PublicKeyDigest([n; 32]), edition: 0 },
            Utc::now(),
        )
    }

    #[test]
    fn test_linear_chain_scores_s1() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Store::open(dir.path(), 500).expect("open");
        let v = id(1);
        store
            .transaction(|txn| {
                txn.state_mut().put_identity(own_row(1));
                txn.state_mut().put_identity(remote_row(2));
                txn.state_mut().put_identity(remote_row(3));
                txn.state_mut().put_identity(remote_row(4));
                txn.state_mut().put_trust(Trust::new(id(1), id(2), 100, None, Utc::now()));
                txn.state_mut().put_trust(Trust::new(id(2), id(3), 100, None, Utc::now()));
                txn.state_mut().put_trust(Trust::new(id(3), id(4), 100, None, Utc::now()));
                reconcile(txn, &[id(2)])?;
                reconcile(txn, &[id(3)])?;
                reconcile(txn, &[id(4)])?;
                Ok(())
            })
            .expect("txn");

        store.read(|state| {
            let a = state.score(v, id(2)).expect("a score");
            assert_eq!((a.rank, a.capacity, a.value), (Some(1), 40, 100));
            let b = state.score(v, id(3)).expect("b score");
            assert_eq!((b.rank, b.capacity, b.value), (Some(2), 16, 40));
            let c = state.score(v, id(4)).expect("c score");
            assert_eq!((c.rank, c.capacity, c.value), (Some(3), 6, 16));
        });
    }

    #[test]
    fn test_viewer_never_has_own_score() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Store::open(dir.path(), 500).expect("open");
        store
            .transaction(|txn| {
                txn.state_mut().put_identity(own_row(1));
                let changed = recompute_one(txn, id(1), id(1))?;
                assert!(!changed);
                Ok(())
            })
            .expect("txn");
        store.read(|state| assert!(state.score(id(1), id(1)).is_none()));
    }
}
