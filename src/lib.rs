//! Client and orchestrator for a pool of SentiStrength-style scoring engines.
//!
//! Each engine is an external process bound to one TCP port and one language.
//! [`WorkerPool`] spawns and tracks those processes, spreads text items across
//! them round-robin and collects per-item [`ScoreResult`]s in input order.
//! [`ScoreStream`] slices unbounded input into batches so memory stays bounded
//! to one batch.

pub mod client;
pub mod config;
pub mod error;
pub mod language;
pub mod pool;
pub mod probe;
pub mod runtime;
pub mod scheduler;
pub mod worker;

pub use client::{ScoreResult, TextScoreClient};
pub use config::{ClientConfig, EngineConfig, PoolConfig, WorkerSettings};
pub use error::{ClientError, ConfigError, PoolError, WorkerError};
pub use language::LanguageCode;
pub use pool::{InstanceReport, PoolState, WorkerPool, WorkerSelector};
pub use probe::HealthProbe;
pub use runtime::AsyncWorkerPool;
pub use scheduler::ScoreStream;
pub use worker::{WorkerProcess, WorkerState};
