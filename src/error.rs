//! Error types for the scoring pool.
//!
//! Errors are split by layer: [`ClientError`] for one request/response
//! exchange, [`WorkerError`] for the lifecycle of one engine process,
//! [`PoolError`] for pool-wide operations and [`ConfigError`] for loading
//! settings.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::PoisonError;
use thiserror::Error;

use crate::worker::WorkerState;

/// Failure of a single exchange with one worker.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No listener accepted a connection on the port
    #[error("worker at port {port} is unreachable: {source}")]
    Unreachable {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Connected, but sending the request or reading the reply failed
    #[error("exchange with worker at port {port} failed: {source}")]
    Io {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Reply did not contain exactly three numeric fields
    #[error("malformed reply from worker at port {port}: {response:?}")]
    Malformed { port: u16, response: String },
}

impl ClientError {
    /// Create a malformed-reply error
    pub fn malformed(port: u16, response: impl Into<String>) -> Self {
        ClientError::Malformed {
            port,
            response: response.into(),
        }
    }

    /// Port of the worker the failed exchange was addressed to.
    pub fn port(&self) -> u16 {
        match self {
            ClientError::Unreachable { port, .. }
            | ClientError::Io { port, .. }
            | ClientError::Malformed { port, .. } => *port,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable { .. })
    }
}

/// Failure while starting or stopping one engine process.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Start requested from a state other than NotStarted
    #[error("cannot start a worker in state {state:?}")]
    InvalidState { state: WorkerState },

    /// Port already answers probes without being tracked
    #[error("port {port} is already served by another engine")]
    PortInUse { port: u16 },

    /// The language data directory does not exist
    #[error("language data directory not found: {}", path.display())]
    MissingLanguageData { path: PathBuf },

    /// The engine executable could not be spawned
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited before it answered a probe
    #[error("engine for port {port} exited before becoming ready ({status})")]
    ExitedEarly { port: u16, status: ExitStatus },

    /// The engine never answered a probe within the attempt budget
    #[error("engine at port {port} not ready after {attempts} attempts")]
    StartupTimeout { port: u16, attempts: u32 },

    /// Signalling the process group failed
    #[error("failed to signal process group {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    /// Port still answers probes after the grace period
    #[error("engine {pid} at port {port} is still running after terminate")]
    ShutdownIncomplete { port: u16, pid: u32 },
}

impl WorkerError {
    /// Create a signal error
    pub fn signal(pid: u32, reason: impl Into<String>) -> Self {
        WorkerError::Signal {
            pid,
            reason: reason.into(),
        }
    }
}

/// Failure of a pool-wide operation.
#[derive(Debug, Error)]
pub enum PoolError {
    /// No worker could be started for the language
    #[error("no live workers for language {language}")]
    NoLiveWorkers { language: String },

    /// Port search ran past the configured skip budget or the port range
    #[error("no free port found starting from {from}")]
    PortsExhausted { from: u16 },

    /// An item of a batch failed
    #[error("item {index} failed: {source}")]
    Item {
        index: usize,
        #[source]
        source: ClientError,
    },

    /// Starting a worker failed for a reason other than an occupied port
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// Some workers kept running after a stop request
    #[error("workers still running at ports {ports:?}")]
    ShutdownIncomplete { ports: Vec<u16> },

    /// The dispatch thread pool could not be built
    #[error("failed to build dispatch threads: {0}")]
    Dispatch(#[from] rayon::ThreadPoolBuildError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PoolError::Internal(message.into())
    }
}

/// Failure while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    /// Create a validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
pub type WorkerResult<T> = Result<T, WorkerError>;
pub type PoolResult<T> = Result<T, PoolError>;

/// Helper trait to recover the guard from a poisoned lock
pub trait LockResultExt<T> {
    /// Recover a poisoned guard, logging which operation hit it.
    fn recover_poison(self, context: &str) -> T;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> T {
        match self {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!(
                    target: "sentipool::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                poisoned.into_inner()
            }
        }
    }
}
