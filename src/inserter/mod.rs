// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identity inserter (§4.6, §4.6.1): a single background task that
//! periodically re-publishes any `OwnIdentity` that has changed or gone
//! stale.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{codec, engine::Engine, graph::IdentityId};

#[derive(Debug, Error)]
pub enum InsertError {
    #[error("transient network failure inserting {0:?}: {1}")]
    Transient(IdentityId, String),
}

/// The out-of-scope network collaborator for publishing an encoded document.
#[async_trait]
pub trait InsertNetwork: Send + Sync {
    async fn insert(&self, identity: IdentityId, encoded: Vec<u8>) -> Result<(), InsertError>;
}

pub struct InserterConfig {
    pub period: Duration,
    pub stale_after: chrono::Duration,
}

pub struct Inserter {
    engine: Arc<Engine>,
    network: Arc<dyn InsertNetwork>,
    config: InserterConfig,
    in_flight: DashMap<IdentityId, ()>,
}

impl Inserter {
    pub fn new(engine: Arc<Engine>, network: Arc<dyn InsertNetwork>, config: InserterConfig) -> Self {
        Inserter { engine, network, config, in_flight: DashMap::new() }
    }

    fn jittered_period(&self) -> Duration {
        crate::utils::jitter(self.config.period, 0.5, 1.5)
    }

    /// Identities due for re-insertion: locally edited since last insert, or
    /// not inserted within `stale_after` (§4.6). Skips anything already
    /// `in_flight` — concurrent inserts of the same identity are prohibited.
    fn due_identities(&self) -> Vec<IdentityId> {
        let now = Utc::now();
        self.engine.read(|state| {
            state
                .identities
                .values()
                .filter_map(|row| {
                    let own = row.own.as_ref()?;
                    if self.in_flight.contains_key(&row.id) {
                        return None;
                    }
                    let due = match own.last_inserted_at {
                        None => true,
                        Some(last) => {
                            row.last_changed_at > last || now - last > self.config.stale_after
                        },
                    };
                    due.then_some(row.id)
                })
                .collect()
        })
    }

    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            let sleep = self.jittered_period();
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("inserter shutting down");
                    return;
                }
                _ = tokio::time::sleep(sleep) => {}
            }

            for id in self.due_identities() {
                self.in_flight.insert(id, ());
                self.insert_one(id).await;
                self.in_flight.remove(&id);
            }
        }
    }

    async fn insert_one(&self, id: IdentityId) {
        let mut doc = match crate::engine::ops::build_outgoing_document(self.engine.store(), id) {
            Some(doc) => doc,
            None => return,
        };
        doc.edition += 1;

        let encoded = codec::encode(&doc);
        match self.network.insert(id, encoded).await {
            Ok(()) => {
                if let Err(e) = self.engine.record_insert_success(id, doc.edition).await {
                    warn!(identity = %id, error = %e, "failed to record successful insert");
                }
            },
            Err(e) => warn!(identity = %id, error = %e, "insert failed, will retry next period"),
        }
    }
}
