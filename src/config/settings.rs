use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults::*;
use crate::error::ConfigError;
use crate::language::LanguageCode;

/// Settings for one pool of engine processes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// First port tried when allocating workers
    pub start_port: u16,
    /// Worker count: non-negative is absolute, negative is relative to the CPU
    /// count (-1 = all CPUs, -2 = all but one). Zero and counts that resolve
    /// below one are raised to a single worker.
    pub workers: i32,
    /// Maximum concurrent requests per batch; defaults to the worker count
    pub concurrency: Option<usize>,
    /// Items per batch when streaming
    pub batch_size: usize,
    /// Consecutive occupied ports skipped before giving up
    pub max_port_skips: u16,
    pub worker: WorkerSettings,
    pub client: ClientConfig,
    pub engine: EngineConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            start_port: DEFAULT_START_PORT,
            workers: DEFAULT_WORKERS,
            concurrency: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_port_skips: DEFAULT_MAX_PORT_SKIPS,
            worker: WorkerSettings::default(),
            client: ClientConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Preset for a single engine on the classic single-instance port.
    pub fn single() -> Self {
        Self {
            start_port: SINGLE_INSTANCE_PORT,
            workers: 1,
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_port == 0 {
            return Err(ConfigError::invalid("start_port must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid("batch_size must be at least 1"));
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::invalid("concurrency must be at least 1"));
        }
        if self.worker.startup_attempts == 0 {
            return Err(ConfigError::invalid(
                "worker.startup_attempts must be at least 1",
            ));
        }
        if self.engine.program.trim().is_empty() {
            return Err(ConfigError::invalid("engine.program must not be empty"));
        }
        Ok(())
    }

    /// Worker count resolved against the CPUs available to this process.
    pub fn resolved_workers(&self) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        resolve_worker_count(self.workers, cpus)
    }
}

/// Resolve a relative worker count.
///
/// Non-negative values are absolute; negative values count back from the CPU
/// count so that -1 means every CPU and -2 leaves one free. The result is
/// never below one.
pub fn resolve_worker_count(workers: i32, cpus: usize) -> usize {
    let resolved = if workers >= 0 {
        workers as i64
    } else {
        cpus as i64 + 1 + workers as i64
    };
    resolved.max(1) as usize
}

/// Lifecycle timing for each engine process.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerSettings {
    /// Readiness probes before a start is declared failed
    pub startup_attempts: u32,
    /// Fixed sleep between readiness probes
    pub startup_backoff_ms: u64,
    /// Wait between SIGTERM and the confirming probe
    pub shutdown_grace_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            startup_attempts: DEFAULT_STARTUP_ATTEMPTS,
            startup_backoff_ms: DEFAULT_STARTUP_BACKOFF_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

impl WorkerSettings {
    pub fn startup_backoff(&self) -> Duration {
        Duration::from_millis(self.startup_backoff_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// How the orchestrator talks to a running engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub host: String,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
    /// Read/write timeout for health probes
    pub liveness_timeout_ms: u64,
    /// Text sent by health probes
    pub probe_text: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            liveness_timeout_ms: DEFAULT_LIVENESS_TIMEOUT_MS,
            probe_text: DEFAULT_PROBE_TEXT.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }
}

/// Command used to launch one engine process.
///
/// `args` is a template: `{language}`, `{data_dir}` and `{port}` are
/// substituted per worker.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Directory holding one data directory per language; defaults to the
    /// current directory
    pub working_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: default_engine_args(),
            working_dir: None,
        }
    }
}

impl EngineConfig {
    pub fn render_args(&self, language: LanguageCode, port: u16) -> Vec<String> {
        let port = port.to_string();
        let data_dir = language.data_dir_arg();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{language}", language.as_str())
                    .replace("{data_dir}", &data_dir)
                    .replace("{port}", &port)
            })
            .collect()
    }
}
