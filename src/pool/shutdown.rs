//! Stopping workers and tearing the pool down.

use super::WorkerPool;
use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::language::LanguageCode;

/// Identifies one tracked worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSelector {
    Port(u16),
    Pid(u32),
}

impl WorkerPool {
    /// Stop one worker.
    ///
    /// Returns `true` once the port no longer answers and the handle was
    /// removed. Returns `false` if no tracked worker matches or if the
    /// process is still serving after the grace period; in that case the
    /// handle stays tracked and the caller can retry or inspect
    /// [`WorkerPool::check_instances`].
    pub fn stop_server(&mut self, selector: WorkerSelector) -> bool {
        let port = match selector {
            WorkerSelector::Port(port) => self.workers.contains_key(&port).then_some(port),
            WorkerSelector::Pid(pid) => self
                .workers
                .values()
                .find(|worker| worker.pid() == Some(pid))
                .map(|worker| worker.port()),
        };

        match port {
            Some(port) => self.stop_port(port),
            None => {
                log::warn!(target: "sentipool::pool", "Instance not found: {:?}", selector);
                false
            }
        }
    }

    fn stop_port(&mut self, port: u16) -> bool {
        let grace = self.config.worker.shutdown_grace();
        let Some(worker) = self.workers.get_mut(&port) else {
            return false;
        };

        match worker.stop(grace, &self.probe) {
            Ok(()) => {
                self.workers.remove(&port);
                true
            }
            Err(e) => {
                log::warn!(target: "sentipool::pool", "Unable to stop worker: {}", e);
                false
            }
        }
    }

    /// Stop every tracked worker.
    ///
    /// Each worker gets one stop attempt per call. Workers that keep serving
    /// stay tracked and are reported in [`PoolError::ShutdownIncomplete`].
    /// Calling this on an empty pool is a no-op.
    pub fn stop_all(&mut self) -> PoolResult<()> {
        let ports = self.ports();
        if ports.is_empty() {
            return Ok(());
        }

        log::info!(
            target: "sentipool::pool",
            "Stopping {} instances in {}",
            ports.len(),
            self.language
        );
        let lingering: Vec<u16> = ports
            .into_iter()
            .filter(|&port| !self.stop_port(port))
            .collect();

        if lingering.is_empty() {
            Ok(())
        } else {
            Err(PoolError::ShutdownIncomplete { ports: lingering })
        }
    }

    /// Replace the pool's language.
    ///
    /// Every worker bound to the old language is stopped first; the language
    /// only changes if all of them went down. New workers start lazily.
    pub fn switch_language(&mut self, language: LanguageCode) -> PoolResult<()> {
        if language == self.language {
            return Ok(());
        }
        log::info!(
            target: "sentipool::pool",
            "Switching pool from {} to {}",
            self.language,
            language
        );
        self.stop_all()?;
        self.language = language;
        Ok(())
    }

    /// Run `f` against a fresh pool and stop every worker afterwards.
    ///
    /// The pool is stopped on every exit path: normal return, error and
    /// unwinding (via `Drop`). An error from `f` takes precedence over a
    /// shutdown error.
    pub fn scoped<R, F>(language: LanguageCode, config: PoolConfig, f: F) -> PoolResult<R>
    where
        F: FnOnce(&mut WorkerPool) -> PoolResult<R>,
    {
        let mut pool = WorkerPool::new(language, config)?;
        let result = f(&mut pool);
        let shutdown = pool.stop_all();
        let value = result?;
        shutdown?;
        Ok(value)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        log::debug!(
            target: "sentipool::pool",
            "Pool dropped with {} workers, stopping them",
            self.workers.len()
        );
        if let Err(e) = self.stop_all() {
            log::warn!(target: "sentipool::pool", "Cleanup on drop incomplete: {}", e);
        }
    }
}
