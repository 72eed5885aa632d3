// SPDX-License-Identifier: AGPL-3.0-or-later

//! Identity fetcher (§4.5, §4.5.1): a supervisor task bounding concurrent
//! fetches behind a semaphore, with full-jitter exponential backoff per
//! `(identity, edition)`.

pub mod network;
pub mod retry;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use dashmap::DashMap;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    cfg::enums::FetchState,
    codec,
    engine::Engine,
    fetcher::{
        network::{FetchError, FetchNetwork},
        retry::RetryState,
    },
    graph::IdentityId,
};

pub struct FetcherConfig {
    pub max_concurrent_fetches: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub scheduling_interval: Duration,
}

pub struct Fetcher {
    engine: Arc<Engine>,
    network: Arc<dyn FetchNetwork>,
    config: FetcherConfig,
    retries: DashMap<(IdentityId, u64), RetryState>,
}

impl Fetcher {
    pub fn new(engine: Arc<Engine>, network: Arc<dyn FetchNetwork>, config: FetcherConfig) -> Self {
        Fetcher { engine, network, config, retries: DashMap::new() }
    }

    /// Candidate identities: known, not yet `Fetched` for their current
    /// edition, with a positive Score in at least one viewer's tree (§4.5).
    fn candidates(&self) -> Vec<(IdentityId, u64)> {
        self.engine.read(|state| {
            let mut out = Vec::new();
            for row in state.identities.values() {
                if !row.needs_refetch() {
                    continue;
                }
                let has_positive_score = state
                    .idx_score_by_target
                    .get(&row.id)
                    .into_iter()
                    .flatten()
                    .any(|viewer| state.score(*viewer, row.id).map(|s| s.value > 0).unwrap_or(false));
                if has_positive_score {
                    let next_edition = row.latest_edition_hint.max(row.current_edition);
                    out.push((row.id, next_edition));
                }
            }
            out
        })
    }

    /// Runs until `cancel` fires. On cancellation, stops scheduling new
    /// fetches and aborts every in-flight child via `JoinSet::shutdown`.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("fetcher supervisor shutting down");
                    in_flight.shutdown().await;
                    return;
                }
                _ = tokio::time::sleep(self.config.scheduling_interval) => {}
            }

            let now = Utc::now();
            for (id, edition) in self.candidates() {
                let due = self
                    .retries
                    .get(&(id, edition))
                    .map(|r| r.is_due(now))
                    .unwrap_or(true);
                if !due {
                    continue;
                }

                let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
                let this = Arc::clone(&self);
                in_flight.spawn(async move {
                    let _permit = permit;
                    this.fetch_one(id, edition).await;
                });
            }

            while in_flight.try_join_next().is_some() {}
        }
    }

    async fn fetch_one(&self, id: IdentityId, edition: u64) {
        let address = match self.engine.read(|state| state.identities.get(&id).map(|r| r.request_address)) {
            Some(a) => a,
            None => return,
        };

        match self.network.fetch(address, edition).await {
            Ok(bytes) => {
                match codec::decode(&bytes, address, edition) {
                    Ok(doc) => {
                        if let Err(e) = self.engine.apply_document(id, &doc).await {
                            warn!(identity = %id, error = %e, "apply_document failed after successful fetch");
                        }
                        self.retries.remove(&(id, edition));
                    },
                    Err(e) => {
                        warn!(identity = %id, edition, error = %e, "document parse failed");
                        let _ = self.engine.mark_parsing_failed(id, edition).await;
                        self.retries.remove(&(id, edition));
                    },
                }
            },
            Err(FetchError::NewerEditionExists { latest, .. }) => {
                let _ = self.engine.note_edition_hint(id, latest).await;
                self.retries.remove(&(id, edition));
            },
            Err(FetchError::Transient { reason, .. }) => {
                warn!(identity = %id, edition, reason, "transient fetch failure, backing off");
                let now = Utc::now();
                let current = self.retries.get(&(id, edition)).map(|r| *r).unwrap_or_else(|| RetryState::first(now));
                let next = current.backoff(self.config.base_backoff, self.config.max_backoff, now);
                self.retries.insert((id, edition), next);
            },
        }
    }
}

/// Used by `mark_parsing_failed`'s debug logging to describe the prior state
/// (kept here rather than in `engine` since it's fetcher-observation-only).
pub fn describe_state(state: FetchState) -> &'static str {
    match state {
        FetchState::NotFetched => "not-fetched",
        FetchState::ParsingFailed => "parsing-failed",
        FetchState::Fetched => "fetched",
    }
}
