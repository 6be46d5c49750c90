//! Default configuration values.
//!
//! The engine invocation mirrors the stock SentiStrength command line:
//! `java -jar SentiStrengthCom.jar sentidata ./EN/ listen 8222 trinary`.

/// First port used by a multi-worker pool.
pub const DEFAULT_START_PORT: u16 = 8222;

/// Port used by the single-instance preset.
pub const SINGLE_INSTANCE_PORT: u16 = 8181;

/// Relative worker count: all CPUs but one.
pub const DEFAULT_WORKERS: i32 = -2;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub const DEFAULT_STARTUP_ATTEMPTS: u32 = 5;
pub const DEFAULT_STARTUP_BACKOFF_MS: u64 = 1000;
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1000;

/// Upper bound on consecutive occupied ports skipped while allocating.
pub const DEFAULT_MAX_PORT_SKIPS: u16 = 64;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LIVENESS_TIMEOUT_MS: u64 = 2000;

/// Payload sent by health probes.
pub const DEFAULT_PROBE_TEXT: &str = "test string";

pub const DEFAULT_PROGRAM: &str = "java";

/// Argument template for the engine; see [`super::EngineConfig::render_args`].
pub fn default_engine_args() -> Vec<String> {
    [
        "-jar",
        "SentiStrengthCom.jar",
        "sentidata",
        "{data_dir}",
        "listen",
        "{port}",
        "trinary",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
