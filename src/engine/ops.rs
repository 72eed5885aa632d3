// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::Utc;

use crate::{
    codec::document::ParsedDocument,
    engine::{error::EngineError, recompute::reconcile},
    graph::{validators, IdentityId, IdentityRow, Trust, VersionedAddress},
    persistence::{Store, Txn},
};

/// Phase A + B/C of `set_trust` (§4.3): create or update the edge, then
/// reconcile every affected viewer tree.
pub fn set_trust(
    store: &Store,
    truster: IdentityId,
    trustee: IdentityId,
    raw_value: i32,
    comment: Option<String>,
) -> Result<()> {
    if let Some(c) = &comment {
        validators::validate_comment(c)?;
    }
    store.transaction(|txn| {
        require_identity(txn, truster)?;
        require_identity(txn, trustee)?;
        let trust = Trust::new(truster, trustee, raw_value, comment.clone(), Utc::now());
        txn.state_mut().put_trust(trust);
        reconcile(txn, &[trustee])?;
        Ok(())
    })
}

pub fn remove_trust(store: &Store, truster: IdentityId, trustee: IdentityId) -> Result<()> {
    store.transaction(|txn| {
        if txn.state_mut().delete_trust(truster, trustee).is_none() {
            return Err(EngineError::NotTrusted { truster, trustee }.into());
        }
        reconcile(txn, &[trustee])?;
        Ok(())
    })
}

/// Inserts a skeleton Identity for a newly-learned request address.
/// Reconcile is a no-op: a brand-new identity has no edges yet.
pub fn add_identity(store: &Store, request_address: VersionedAddress) -> Result<IdentityId> {
    store.transaction(|txn| {
        let row = IdentityRow::skeleton(request_address, Utc::now());
        if txn.state().identities.contains_key(&row.id) {
            return Err(EngineError::DuplicateIdentity(row.id).into());
        }
        let id = row.id;
        txn.state_mut().put_identity(row);
        Ok(id)
    })
}

pub fn delete_identity(store: &Store, id: IdentityId) -> Result<()> {
    store.transaction(|txn| {
        if txn.state_mut().delete_identity(id).is_none() {
            return Err(EngineError::UnknownIdentity(id).into());
        }

        let outgoing: Vec<IdentityId> = txn.state().trustees_of(id).copied().collect();
        let incoming: Vec<IdentityId> = txn.state().trusters_of(id).copied().collect();
        for trustee in &outgoing {
            txn.state_mut().delete_trust(id, *trustee);
        }
        for truster in &incoming {
            txn.state_mut().delete_trust(*truster, id);
        }

        let viewers: Vec<IdentityId> =
            txn.state().idx_score_by_viewer.get(&id).map(|s| s.iter().copied().collect()).unwrap_or_default();
        for target in viewers {
            txn.state_mut().delete_score(id, target);
        }
        let targets: Vec<IdentityId> =
            txn.state().idx_score_by_target.get(&id).map(|s| s.iter().copied().collect()).unwrap_or_default();
        for viewer in targets {
            txn.state_mut().delete_score(viewer, id);
        }

        reconcile(txn, &outgoing)?;
        Ok(())
    })
}

/// Bulk-replaces `identity_id`'s outgoing trust list and attributes from a
/// freshly-fetched, freshly-parsed document, then reconciles every affected
/// target in one transaction (§4.3). Idempotent (P7): applying the same
/// document twice yields the same state, since the outgoing list is fully
/// replaced each time rather than merged.
pub fn apply_document(store: &Store, identity_id: IdentityId, doc: &ParsedDocument) -> Result<()> {
    validators::validate_contexts(doc.contexts.iter().map(String::as_str))?;
    validators::validate_properties(
        doc.properties.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;
    if let Some(nick) = &doc.nickname {
        validators::validate_nickname(nick)?;
    }
    for entry in &doc.trust_list {
        if let Some(c) = &entry.comment {
            validators::validate_comment(c)?;
        }
    }

    store.transaction(|txn| {
        let now = Utc::now();
        let old_trustees: Vec<IdentityId> = txn.state().trustees_of(identity_id).copied().collect();
        for trustee in &old_trustees {
            txn.state_mut().delete_trust(identity_id, *trustee);
        }

        let mut new_trustees = BTreeSet::new();
        for entry in &doc.trust_list {
            let trustee_id = IdentityId::derive(&entry.trustee_address);
            if !txn.state().identities.contains_key(&trustee_id) {
                txn.state_mut().put_identity(IdentityRow::skeleton(entry.trustee_address, now));
            }
            txn.state_mut().put_trust(Trust::new(
                identity_id,
                trustee_id,
                entry.value,
                entry.comment.clone(),
                now,
            ));
            new_trustees.insert(trustee_id);
        }

        {
            let row = txn
                .state_mut()
                .identities
                .get_mut(&identity_id)
                .ok_or(EngineError::UnknownIdentity(identity_id))?;
            row.current_edition = doc.edition;
            // Nickname is set-once (§3): later editions never overwrite or
            // clear an already-set nickname, matching the reject-on-change
            // rule and keeping repeated applies idempotent (P7).
            if row.nickname.is_none() {
                row.nickname = doc.nickname.clone();
            }
            row.publishes_trust_list = doc.publishes_trust_list;
            row.contexts = doc.contexts.clone();
            row.properties = doc.properties.clone();
            row.last_changed_at = now;
            row.last_fetched_at = Some(now);
            row.fetch_state = crate::cfg::enums::FetchState::Fetched;
        }

        let mut affected: Vec<IdentityId> = old_trustees;
        for t in new_trustees {
            if !affected.contains(&t) {
                affected.push(t);
            }
        }
        reconcile(txn, &affected)?;
        Ok(())
    })
}

/// Creates a brand-new `OwnIdentity` from scratch (as opposed to
/// `restore_own_identity`, which upgrades an already-known remote
/// Identity). Reconcile is a no-op: a freshly created identity has no
/// edges yet.
pub fn create_own_identity(
    store: &Store,
    request_address: VersionedAddress,
    insert_address: VersionedAddress,
) -> Result<IdentityId> {
    store.transaction(|txn| {
        let now = Utc::now();
        let mut row = IdentityRow::skeleton(request_address, now);
        if txn.state().identities.contains_key(&row.id) {
            return Err(EngineError::DuplicateIdentity(row.id).into());
        }
        row.upgrade_to_own(insert_address, now);
        let id = row.id;
        txn.state_mut().put_identity(row);
        Ok(id)
    })
}

/// Upgrades an existing remote Identity into an OwnIdentity, preserving its
/// Trusts and rebuilding its Score vector with itself as viewer (§4.3).
pub fn restore_own_identity(
    store: &Store,
    request_address: VersionedAddress,
    insert_address: VersionedAddress,
) -> Result<IdentityId> {
    let id = IdentityId::derive(&request_address);
    store.transaction(|txn| {
        {
            let row = txn
                .state_mut()
                .identities
                .get_mut(&id)
                .ok_or(EngineError::UnknownIdentity(id))?;
            row.upgrade_to_own(insert_address, Utc::now());
        }
        let direct_trustees: Vec<IdentityId> = txn.state().trustees_of(id).copied().collect();
        reconcile(txn, &direct_trustees)?;
        Ok(id)
    })
}

/// Called by the fetcher on a failed parse: the edition is still consumed
/// (`NotFetched -> ParsingFailed`) so scheduling doesn't retry it forever.
pub fn mark_parsing_failed(store: &Store, identity_id: IdentityId, edition: u64) -> Result<()> {
    store.transaction(|txn| {
        let row = txn
            .state_mut()
            .identities
            .get_mut(&identity_id)
            .ok_or(EngineError::UnknownIdentity(identity_id))?;
        row.current_edition = edition;
        row.fetch_state = crate::cfg::enums::FetchState::ParsingFailed;
        Ok(())
    })
}

/// Called by the fetcher when the network indicates a later edition exists;
/// never treated as authoritative, only a scheduling bias (§4.5).
pub fn note_edition_hint(store: &Store, identity_id: IdentityId, edition: u64) -> Result<()> {
    store.transaction(|txn| {
        let row = txn
            .state_mut()
            .identities
            .get_mut(&identity_id)
            .ok_or(EngineError::UnknownIdentity(identity_id))?;
        row.note_edition_hint(edition);
        Ok(())
    })
}

/// Called by the inserter after a successful upload: bumps the edition and
/// records the insert timestamp on the `OwnIdentityExtra` (§4.6).
pub fn record_insert_success(store: &Store, id: IdentityId, edition: u64) -> Result<()> {
    store.transaction(|txn| {
        let row = txn
            .state_mut()
            .identities
            .get_mut(&id)
            .ok_or(EngineError::UnknownIdentity(id))?;
        row.current_edition = edition;
        if let Some(own) = row.own.as_mut() {
            own.last_inserted_at = Some(Utc::now());
        }
        Ok(())
    })
}

/// Builds the outgoing document for `id` from its current row and trust
/// list, shared by the inserter (publishing a changed identity) and the
/// introduction client (publishing a solver's identity to a solution
/// address).
pub fn build_outgoing_document(store: &Store, id: IdentityId) -> Option<ParsedDocument> {
    store.read(|state| {
        let row = state.identities.get(&id)?;
        let trust_list = state
            .trustees_of(id)
            .filter_map(|trustee| {
                let trust = state.trusts.get(&(id, *trustee))?;
                let trustee_row = state.identities.get(trustee)?;
                Some(crate::codec::TrustListEntry {
                    trustee_address: trustee_row.request_address,
                    value: trust.value as i32,
                    comment: trust.comment.clone(),
                })
            })
            .collect();
        Some(ParsedDocument {
            source_address: row.request_address,
            edition: row.current_edition,
            nickname: row.nickname.clone(),
            publishes_trust_list: row.publishes_trust_list,
            contexts: row.contexts.clone(),
            properties: row.properties.clone(),
            trust_list,
        })
    })
}

fn require_identity(txn: &Txn, id: IdentityId) -> Result<()> {
    if txn.state().identities.contains_key(&id) {
        Ok(())
    } else {
        Err(EngineError::UnknownIdentity(id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PublicKeyDigest;

    fn addr(n: u8) -> VersionedAddress {
        VersionedAddress::Request { key: PublicKeyDigest([n; 32]), edition: 0 }
    }

    #[test]
    fn test_add_identity_then_duplicate_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Store::open(dir.path(), 500).expect("open");
        add_identity(&store, addr(1)).expect("first add");
        let err = add_identity(&store, addr(1)).expect_err("duplicate must fail");
        assert!(err.downcast_ref::<EngineError>().is_some());
    }

    #[test]
    fn test_remove_trust_without_edge_fails() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Store::open(dir.path(), 500).expect("open");
        let a = add_identity(&store, addr(1)).expect("add a");
        let b = add_identity(&store, addr(2)).expect("add b");
        assert!(remove_trust(&store, a, b).is_err());
    }

    #[test]
    fn test_set_then_remove_trust_clears_score() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let store = Store::open(dir.path(), 500).expect("open");
        let v = add_identity(&store, addr(1)).expect("add viewer");
        restore_own_identity(&store, addr(1), VersionedAddress::Insert {
            key: crate::graph::PrivateKeyDigest([1u8; 32]),
            public_key: PublicKeyDigest([1u8; 32]),
            edition: 0,
        })
        .expect("own");
        let a = add_identity(&store, addr(2)).expect("add a");
        set_trust(&store, v, a, 100, None).expect("set trust");
        store.read(|state| assert!(state.score(v, a).is_some()));
        remove_trust(&store, v, a).expect("remove trust");
        store.read(|state| assert!(state.score(v, a).is_none()));
    }
}
