// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;
use wot_engine::{
    cfg::{cli::resolve_startup_paths, config::Config, logger::init_logger},
    engine::Engine,
    fetcher::{
        network::{FetchError, FetchNetwork},
        Fetcher, FetcherConfig,
    },
    graph::VersionedAddress,
    inserter::{InsertError, InsertNetwork, Inserter, InserterConfig},
    persistence::{migrate, Store},
    puzzle::{
        server::{IntroductionNetwork, IntroductionNetworkError, IntroductionServer},
        IntroductionClient, PuzzleStore,
    },
    rpc::Facade,
};

/// Stand-in for the pseudonymous content network this crate publishes to and
/// fetches from (§1, out of scope): every call fails transiently so the
/// workers exercise their real retry/backoff paths against a live process
/// rather than panicking for want of a collaborator.
struct UnimplementedNetwork;

#[async_trait::async_trait]
impl FetchNetwork for UnimplementedNetwork {
    async fn fetch(&self, address: VersionedAddress, edition: u64) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Transient {
            address,
            edition,
            reason: "no network backend configured".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl InsertNetwork for UnimplementedNetwork {
    async fn insert(
        &self,
        identity: wot_engine::graph::IdentityId,
        _encoded: Vec<u8>,
    ) -> Result<(), InsertError> {
        Err(InsertError::Transient(identity, "no network backend configured".to_string()))
    }
}

#[async_trait::async_trait]
impl IntroductionNetwork for UnimplementedNetwork {
    async fn upload_puzzle(
        &self,
        _inserter: wot_engine::graph::IdentityId,
        _day: chrono::NaiveDate,
        _index: u32,
        _puzzle: &wot_engine::graph::IntroductionPuzzle,
    ) -> Result<(), IntroductionNetworkError> {
        Err(IntroductionNetworkError::Upload("no network backend configured".to_string()))
    }

    async fn poll_solution(
        &self,
        _inserter: wot_engine::graph::IdentityId,
        _puzzle_id: &wot_engine::graph::PuzzleId,
    ) -> Result<Option<(String, VersionedAddress)>, IntroductionNetworkError> {
        Ok(None)
    }

    async fn upload_solution(
        &self,
        _inserter: wot_engine::graph::IdentityId,
        _puzzle_id: &wot_engine::graph::PuzzleId,
        _solution: &str,
        _solver_document: Vec<u8>,
    ) -> Result<(), IntroductionNetworkError> {
        Err(IntroductionNetworkError::Upload("no network backend configured".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let paths = resolve_startup_paths("config/wot-node.yaml", "config/logger.yaml")
        .context("failed to resolve startup config paths")?;
    let cfg = Config::load_from_file(&paths.node_config).context("failed to load config")?;

    let logger_config_path =
        paths.logger_config.to_str().context("logger config path is not valid UTF-8")?;
    let _log_guard = init_logger(logger_config_path).context("failed to init logger")?;
    info!(path = ?paths.node_config, "starting wot-node");

    let store = Arc::new(
        Store::open(&cfg.persistence.data_dir, cfg.persistence.compact_every_n_txns)
            .context("failed to open store")?,
    );
    migrate::run(&store).context("schema migration failed")?;

    let engine = Arc::new(Engine::new(store.clone()));
    let puzzles = Arc::new(PuzzleStore::new(store.clone()));
    let network = Arc::new(UnimplementedNetwork);

    let fetcher = Arc::new(Fetcher::new(
        engine.clone(),
        network.clone(),
        FetcherConfig {
            max_concurrent_fetches: cfg.fetcher.max_concurrent_fetches,
            base_backoff: cfg.fetcher.base_backoff,
            max_backoff: cfg.fetcher.max_backoff,
            scheduling_interval: cfg.fetcher.scheduling_interval,
        },
    ));
    let inserter = Arc::new(Inserter::new(
        engine.clone(),
        network.clone(),
        InserterConfig {
            period: cfg.inserter.period,
            stale_after: chrono::Duration::from_std(cfg.inserter.stale_after)
                .context("inserter.stale_after out of range")?,
        },
    ));
    let introduction_server = Arc::new(IntroductionServer::new(
        engine.clone(),
        puzzles.clone(),
        network.clone(),
        cfg.puzzle.solution_poll_interval,
        chrono::Duration::from_std(cfg.puzzle.puzzle_validity).context("puzzle.puzzle_validity out of range")?,
    ));
    let introduction_client = Arc::new(IntroductionClient::new(
        engine.clone(),
        puzzles.clone(),
        network,
        cfg.puzzle.client_pool_target,
        cfg.puzzle.max_puzzles_per_identity,
        cfg.puzzle.inserter_lru_capacity,
        cfg.puzzle.solution_poll_interval,
    ));
    let _facade = Facade::new(engine, puzzles, introduction_client.clone());

    let cancel = CancellationToken::new();
    let workers = vec![
        tokio::spawn(fetcher.run(cancel.clone())),
        tokio::spawn(inserter.run(cancel.clone())),
        tokio::spawn(introduction_server.run(cancel.clone())),
        tokio::spawn(introduction_client.run(cancel.clone())),
    ];

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown signal received, stopping workers");
    cancel.cancel();
    for worker in workers {
        let _ = worker.await;
    }

    Ok(())
}
