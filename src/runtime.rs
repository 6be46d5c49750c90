//! Async facade over [`WorkerPool`].
//!
//! The pool itself is synchronous: starting a worker sleeps between probes
//! and dispatch blocks on TCP reads. Every call here runs on tokio's blocking
//! thread pool behind a mutex, so async callers never stall the reactor and
//! only one operation touches the pool at a time.

use std::sync::{Arc, Mutex};

use crate::client::ScoreResult;
use crate::error::{ClientResult, LockResultExt, PoolError, PoolResult};
use crate::pool::{InstanceReport, PoolState, WorkerPool};

/// Cloneable handle to a pool shared between tasks.
#[derive(Clone)]
pub struct AsyncWorkerPool {
    inner: Arc<Mutex<WorkerPool>>,
}

impl std::fmt::Debug for AsyncWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncWorkerPool").finish_non_exhaustive()
    }
}

impl AsyncWorkerPool {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    async fn with_pool<R, F>(&self, f: F) -> PoolResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut WorkerPool) -> PoolResult<R> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut pool = inner.lock().recover_poison("AsyncWorkerPool::with_pool");
            f(&mut *pool)
        })
        .await
        .map_err(|e| PoolError::internal(format!("pool task failed: {e}")))?
    }

    /// Start the configured number of workers; returns how many started.
    pub async fn start_all(&self) -> PoolResult<usize> {
        self.with_pool(|pool| Ok(pool.start_all())).await
    }

    pub async fn run_batch(&self, items: Vec<String>) -> PoolResult<Vec<ScoreResult>> {
        self.with_pool(move |pool| pool.run_batch(&items)).await
    }

    pub async fn run_batch_outcomes(
        &self,
        items: Vec<String>,
    ) -> PoolResult<Vec<ClientResult<ScoreResult>>> {
        self.with_pool(move |pool| pool.run_batch_outcomes(&items)).await
    }

    pub async fn score(&self, text: String) -> PoolResult<ScoreResult> {
        self.with_pool(move |pool| pool.score(&text)).await
    }

    pub async fn stop_all(&self) -> PoolResult<()> {
        self.with_pool(|pool| pool.stop_all()).await
    }

    pub async fn status(&self) -> PoolResult<PoolState> {
        self.with_pool(|pool| Ok(pool.status())).await
    }

    pub async fn check_instances(&self) -> PoolResult<Vec<InstanceReport>> {
        self.with_pool(|pool| Ok(pool.check_instances())).await
    }
}
