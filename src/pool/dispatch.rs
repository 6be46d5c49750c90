//! Round-robin dispatch of a batch across live workers.

use rayon::prelude::*;

use super::WorkerPool;
use crate::client::ScoreResult;
use crate::error::{ClientResult, PoolError, PoolResult};

/// Port for every item of a batch: item `i` goes to `ports[i % ports.len()]`.
///
/// Returns an empty assignment when `ports` is empty.
pub fn assign_ports(ports: &[u16], count: usize) -> Vec<u16> {
    if ports.is_empty() {
        return Vec::new();
    }
    (0..count).map(|i| ports[i % ports.len()]).collect()
}

impl WorkerPool {
    /// Ports of workers currently in the Ready state, ascending.
    pub fn live_ports(&self) -> Vec<u16> {
        self.workers
            .values()
            .filter(|worker| worker.state() == crate::worker::WorkerState::Ready)
            .map(|worker| worker.port())
            .collect()
    }

    /// Score a batch and report every item's outcome separately.
    ///
    /// Starts the pool first if it has no workers. Items are paired with
    /// ports round-robin and scored concurrently on at most
    /// `min(concurrency, live ports)` threads; the returned vector is in input
    /// order regardless of completion order. Failed items are not retried.
    ///
    /// # Errors
    /// [`PoolError::NoLiveWorkers`] if no worker could be started.
    pub fn run_batch_outcomes<S>(&mut self, items: &[S]) -> PoolResult<Vec<ClientResult<ScoreResult>>>
    where
        S: AsRef<str> + Sync,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        if self.workers.is_empty() {
            log::info!(target: "sentipool::pool", "No servers found, starting servers");
            self.start_all();
        }

        let ports = self.live_ports();
        if ports.is_empty() {
            return Err(PoolError::NoLiveWorkers {
                language: self.language.to_string(),
            });
        }

        let assignments = assign_ports(&ports, items.len());
        let threads = self.concurrency.min(ports.len()).max(1);
        let client = self.client.clone();

        log::debug!(
            target: "sentipool::pool",
            "Dispatching {} items over {} ports on {} threads",
            items.len(),
            ports.len(),
            threads
        );

        // Indexed parallel collect writes each result at its input position
        let outcomes = self.dispatch_threads(threads)?.install(|| {
            items
                .par_iter()
                .zip(assignments.par_iter())
                .map(|(item, &port)| client.score(port, item.as_ref()))
                .collect::<Vec<_>>()
        });
        Ok(outcomes)
    }

    /// Score a batch, failing with the first failed position.
    pub fn run_batch<S>(&mut self, items: &[S]) -> PoolResult<Vec<ScoreResult>>
    where
        S: AsRef<str> + Sync,
    {
        self.run_batch_outcomes(items)?
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| outcome.map_err(|source| PoolError::Item { index, source }))
            .collect()
    }

    /// Score a single text item.
    pub fn score(&mut self, text: &str) -> PoolResult<ScoreResult> {
        self.run_batch(&[text])?
            .pop()
            .ok_or_else(|| PoolError::internal("empty result for a single item"))
    }

    fn dispatch_threads(&mut self, threads: usize) -> PoolResult<&rayon::ThreadPool> {
        if !matches!(&self.dispatch, Some((n, _)) if *n == threads) {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("sentipool-dispatch-{i}"))
                .build()?;
            self.dispatch = Some((threads, pool));
        }
        self.dispatch
            .as_ref()
            .map(|(_, pool)| pool)
            .ok_or_else(|| PoolError::internal("dispatch threads missing"))
    }
}
