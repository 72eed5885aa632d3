// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identity document codec (§4.4, §4.4.1): a flat, sorted `key=value\0`
//! wire format — the same "no nested self-describing container" shape the
//! reference uses for its negotiation payloads — built and parsed through a
//! plain `BTreeMap<String, String>` rather than a tree of typed nodes.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    cfg::enums::YesNo,
    codec::error::CodecError,
    graph::{validators, IdentityId, PublicKeyDigest, VersionedAddress},
};

pub const CURRENT_VERSION: u32 = 1;

/// Configuration constant bounding `trust_list` size (§6); not currently
/// exposed in `Config` since no deployment has needed to tune it.
pub const MAX_TRUST_LIST_LEN: usize = 5000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustListEntry {
    pub trustee_address: VersionedAddress,
    pub value: i32,
    pub comment: Option<String>,
}

/// The result of decoding a document, plus the source identity's address
/// (carried alongside, not part of the wire bytes themselves).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedDocument {
    pub source_address: VersionedAddress,
    pub edition: u64,
    pub nickname: Option<String>,
    pub publishes_trust_list: bool,
    pub contexts: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
    pub trust_list: Vec<TrustListEntry>,
}

fn encode_request_address(address: &VersionedAddress) -> String {
    let key = address.public_key();
    format!("{}:{}", hex::encode(key.0), address.edition())
}

fn decode_request_address(s: &str) -> Result<VersionedAddress, CodecError> {
    let (hex_key, edition_str) = s
        .split_once(':')
        .ok_or_else(|| CodecError::Malformed(format!("bad trust-list identity {s:?}")))?;
    let bytes = hex::decode(hex_key)
        .map_err(|_| CodecError::Malformed(format!("bad trust-list identity hex {s:?}")))?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CodecError::Malformed(format!("trust-list key wrong width in {s:?}")))?;
    let edition: u64 = edition_str
        .parse()
        .map_err(|_| CodecError::Malformed(format!("bad trust-list edition in {s:?}")))?;
    Ok(VersionedAddress::Request { key: PublicKeyDigest(key), edition })
}

/// Encodes a document to bytes. Deterministic element ordering is not
/// required by the spec, but `BTreeMap` gives it for free.
pub fn encode(doc: &ParsedDocument) -> Vec<u8> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("Version".to_string(), CURRENT_VERSION.to_string());
    if let Some(nick) = &doc.nickname {
        map.insert("Nickname".to_string(), nick.clone());
    }
    map.insert(
        "PublishesTrustList".to_string(),
        YesNo::from(doc.publishes_trust_list).to_string(),
    );
    for (i, ctx) in doc.contexts.iter().enumerate() {
        map.insert(format!("Context{i}"), ctx.clone());
    }
    for (name, value) in &doc.properties {
        map.insert(format!("Property.{name}"), value.clone());
    }
    if !doc.trust_list.is_empty() {
        map.insert("TrustListLen".to_string(), doc.trust_list.len().to_string());
        for (i, entry) in doc.trust_list.iter().enumerate() {
            map.insert(format!("Trust{i}.Identity"), encode_request_address(&entry.trustee_address));
            map.insert(format!("Trust{i}.Value"), entry.value.to_string());
            if let Some(comment) = &entry.comment {
                map.insert(format!("Trust{i}.Comment"), comment.clone());
            }
        }
    }

    let mut out = Vec::new();
    for (key, value) in &map {
        out.extend_from_slice(key.as_bytes());
        out.push(b'=');
        out.extend_from_slice(value.as_bytes());
        out.push(0);
    }
    out
}

/// Decodes bytes into a `ParsedDocument`, attributing the result to
/// `source_address` fetched at `edition`. Rejects anything violating §4.4's
/// version/size/charset/duplicate rules.
pub fn decode(
    bytes: &[u8],
    source_address: VersionedAddress,
    edition: u64,
) -> Result<ParsedDocument, CodecError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::Malformed(format!("document is not valid utf-8: {e}")))?;

    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for pair in text.split('\0').filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| CodecError::Malformed(format!("missing '=' in pair {pair:?}")))?;
        map.insert(key.to_string(), value.to_string());
    }

    let version: u32 = map
        .get("Version")
        .ok_or_else(|| CodecError::Malformed("missing Version".to_string()))?
        .parse()
        .map_err(|_| CodecError::Malformed("Version is not a valid integer".to_string()))?;
    if version > CURRENT_VERSION {
        return Err(CodecError::UnsupportedVersion { found: version, max: CURRENT_VERSION });
    }

    let nickname = match map.get("Nickname") {
        Some(nick) => {
            validators::validate_nickname(nick).map_err(|e| CodecError::Malformed(e.to_string()))?;
            Some(nick.clone())
        },
        None => None,
    };

    let publishes_trust_list = map
        .get("PublishesTrustList")
        .map(|v| v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    let mut contexts = BTreeSet::new();
    let mut i = 0usize;
    while let Some(ctx) = map.get(&format!("Context{i}")) {
        contexts.insert(ctx.clone());
        i += 1;
    }
    validators::validate_contexts(contexts.iter().map(String::as_str))
        .map_err(|e| CodecError::Malformed(e.to_string()))?;

    let mut properties = BTreeMap::new();
    for (key, value) in &map {
        if let Some(name) = key.strip_prefix("Property.") {
            properties.insert(name.to_string(), value.clone());
        }
    }
    validators::validate_properties(properties.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .map_err(|e| CodecError::Malformed(e.to_string()))?;

    let mut trust_list = Vec::new();
    if let Some(len_str) = map.get("TrustListLen") {
        let len: usize = len_str
            .parse()
            .map_err(|_| CodecError::Malformed("TrustListLen is not a valid integer".to_string()))?;
        if len > MAX_TRUST_LIST_LEN {
            return Err(CodecError::TrustListTooLarge { limit: MAX_TRUST_LIST_LEN, actual: len });
        }

        let mut seen = BTreeSet::new();
        for idx in 0..len {
            let identity_str = map
                .get(&format!("Trust{idx}.Identity"))
                .ok_or_else(|| CodecError::Malformed(format!("missing Trust{idx}.Identity")))?;
            let trustee_address = decode_request_address(identity_str)?;
            let trustee_id = IdentityId::derive(&trustee_address);
            if !seen.insert(trustee_id) {
                return Err(CodecError::DuplicateTrustee(trustee_id));
            }

            let value: i32 = map
                .get(&format!("Trust{idx}.Value"))
                .ok_or_else(|| CodecError::Malformed(format!("missing Trust{idx}.Value")))?
                .parse()
                .map_err(|_| CodecError::Malformed(format!("Trust{idx}.Value is not an integer")))?;
            let comment = map.get(&format!("Trust{idx}.Comment")).cloned();
            if let Some(c) = &comment {
                validators::validate_comment(c).map_err(|e| CodecError::Malformed(e.to_string()))?;
            }

            trust_list.push(TrustListEntry { trustee_address, value, comment });
        }
    }

    Ok(ParsedDocument {
        source_address,
        edition,
        nickname,
        publishes_trust_list,
        contexts,
        properties,
        trust_list,
    })
}
