//! Pool of engine processes for one language.
//!
//! The pool owns every [`WorkerProcess`] it starts, keyed by port. It starts
//! workers lazily on the first batch, hands items out round-robin across the
//! live ports and stops the whole set on request or when dropped.
//!
//! Mutation (start/stop) and dispatch both take `&mut self`, so a batch can
//! never be in flight while the port map changes. Callers that share a pool
//! across threads wrap it in a lock (see [`crate::runtime::AsyncWorkerPool`]).

mod dispatch;
mod ports;
mod shutdown;

use std::collections::BTreeMap;

use crate::client::TextScoreClient;
use crate::config::PoolConfig;
use crate::error::PoolResult;
use crate::language::LanguageCode;
use crate::probe::HealthProbe;
use crate::worker::{WorkerProcess, WorkerState};

pub use dispatch::assign_ports;
pub use ports::first_candidate;
pub use shutdown::WorkerSelector;

/// Observable lifecycle of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// No worker has been started yet
    Uninitialized,
    /// Number of tracked workers
    Running(usize),
    /// Workers were started once and all have been removed since
    Stopped,
}

/// Snapshot of one tracked worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceReport {
    pub pid: Option<u32>,
    pub port: u16,
    pub state: WorkerState,
    /// Whether the port answered a probe just now
    pub live: bool,
}

pub struct WorkerPool {
    language: LanguageCode,
    config: PoolConfig,
    target_workers: usize,
    concurrency: usize,
    workers: BTreeMap<u16, WorkerProcess>,
    client: TextScoreClient,
    probe: HealthProbe,
    dispatch: Option<(usize, rayon::ThreadPool)>,
    ever_started: bool,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("language", &self.language)
            .field("target_workers", &self.target_workers)
            .field("concurrency", &self.concurrency)
            .field("ports", &self.ports())
            .finish()
    }
}

impl WorkerPool {
    /// Create an empty pool. No process is spawned until
    /// [`WorkerPool::start_all`] or the first batch.
    ///
    /// The worker count and dispatch concurrency are resolved here, once.
    pub fn new(language: LanguageCode, config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        let target_workers = config.resolved_workers();
        let concurrency = config.concurrency.unwrap_or(target_workers);

        Ok(Self {
            language,
            target_workers,
            concurrency,
            workers: BTreeMap::new(),
            client: TextScoreClient::new(&config.client),
            probe: HealthProbe::new(&config.client),
            dispatch: None,
            ever_started: false,
            config,
        })
    }

    pub fn language(&self) -> LanguageCode {
        self.language
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of workers `start_all` aims for.
    pub fn target_workers(&self) -> usize {
        self.target_workers
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn probe(&self) -> &HealthProbe {
        &self.probe
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Tracked ports in ascending order.
    pub fn ports(&self) -> Vec<u16> {
        self.workers.keys().copied().collect()
    }

    pub fn workers(&self) -> impl Iterator<Item = &WorkerProcess> {
        self.workers.values()
    }

    pub fn status(&self) -> PoolState {
        match self.workers.len() {
            0 if self.ever_started => PoolState::Stopped,
            0 => PoolState::Uninitialized,
            n => PoolState::Running(n),
        }
    }

    /// Probe every tracked worker and log one line per instance.
    pub fn check_instances(&self) -> Vec<InstanceReport> {
        if self.workers.is_empty() {
            log::info!(target: "sentipool::pool", "No instances to check");
        }
        self.workers
            .values()
            .map(|worker| {
                let report = InstanceReport {
                    pid: worker.pid(),
                    port: worker.port(),
                    state: worker.state(),
                    live: worker.is_live(&self.probe),
                };
                log::info!(
                    target: "sentipool::pool",
                    "Instance {:?} at port {} status {}",
                    report.pid,
                    report.port,
                    if report.live { "WORKS" } else { "FAILED" }
                );
                report
            })
            .collect()
    }
}
