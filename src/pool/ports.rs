//! Port allocation and worker start-up.

use super::WorkerPool;
use crate::error::{PoolError, PoolResult, WorkerError};
use crate::worker::WorkerProcess;

/// First port to try: one above the highest tracked port, or `start_port`
/// when nothing at or above it is tracked. `None` past the top of the range.
pub fn first_candidate(highest_tracked: Option<u16>, start_port: u16) -> Option<u16> {
    let floor = u32::from(start_port).saturating_sub(1);
    let top = highest_tracked.map(u32::from).unwrap_or(0).max(floor);
    u16::try_from(top + 1).ok()
}

impl WorkerPool {
    fn next_candidate(&self) -> PoolResult<u16> {
        let highest = self.workers.keys().next_back().copied();
        first_candidate(highest, self.config.start_port).ok_or(PoolError::PortsExhausted {
            from: self.config.start_port,
        })
    }

    /// Start one worker and track it.
    ///
    /// With `port = None` the next candidate above the tracked ports is used.
    /// A candidate that is already tracked, or that answers probes without
    /// being tracked, is skipped in favour of the next port, up to
    /// `max_port_skips` times. Returns the port the worker was bound to.
    pub fn start_server(&mut self, port: Option<u16>) -> PoolResult<u16> {
        let first = match port {
            Some(port) => port,
            None => self.next_candidate()?,
        };
        let mut candidate = first;
        let mut skips = 0u16;

        loop {
            if !self.workers.contains_key(&candidate) {
                let mut worker = WorkerProcess::new(self.language, candidate);
                match worker.start(&self.config.engine, &self.config.worker, &self.probe) {
                    Ok(()) => {
                        self.workers.insert(candidate, worker);
                        self.ever_started = true;
                        return Ok(candidate);
                    }
                    Err(WorkerError::PortInUse { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            log::warn!(
                target: "sentipool::pool",
                "Port {} is taken, trying the next one",
                candidate
            );
            skips += 1;
            if skips > self.config.max_port_skips {
                return Err(PoolError::PortsExhausted { from: first });
            }
            candidate = candidate
                .checked_add(1)
                .ok_or(PoolError::PortsExhausted { from: first })?;
        }
    }

    /// Start the resolved number of workers.
    ///
    /// Individual start failures are logged and skipped; the return value is
    /// the number of workers actually started.
    pub fn start_all(&mut self) -> usize {
        self.start_workers(self.target_workers)
    }

    /// Start `count` additional workers on successive free ports.
    pub fn start_workers(&mut self, count: usize) -> usize {
        log::info!(
            target: "sentipool::pool",
            "Starting {} servers in {}",
            count,
            self.language
        );

        let mut started = 0;
        for _ in 0..count {
            match self.start_server(None) {
                Ok(_) => started += 1,
                Err(e @ PoolError::PortsExhausted { .. }) => {
                    log::warn!(target: "sentipool::pool", "{}", e);
                    break;
                }
                Err(e) => {
                    log::warn!(target: "sentipool::pool", "Worker failed to start: {}", e);
                }
            }
        }

        log::info!(
            target: "sentipool::pool",
            "Running {} instances ({} started now)",
            self.workers.len(),
            started
        );
        started
    }
}
