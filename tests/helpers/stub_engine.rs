//! Pool configurations backed by the `sentistub` binary.

use sentipool::{ClientConfig, EngineConfig, HealthProbe, LanguageCode, PoolConfig, WorkerSettings};
use tempfile::TempDir;

pub(crate) const STUB: &str = env!("CARGO_BIN_EXE_sentistub");

/// Builds a [`PoolConfig`] that spawns `sentistub` in a temporary working
/// directory holding one data directory per language.
pub(crate) struct StubPool {
    pub config: PoolConfig,
    pub root: TempDir,
}

impl StubPool {
    pub(crate) fn new(start_port: u16, workers: i32) -> Self {
        Self::with_languages(start_port, workers, &["EN"])
    }

    pub(crate) fn with_languages(start_port: u16, workers: i32, languages: &[&str]) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        for code in languages {
            std::fs::create_dir(root.path().join(code)).expect("language dir");
        }
        let config = PoolConfig {
            start_port,
            workers,
            worker: WorkerSettings {
                startup_attempts: 100,
                startup_backoff_ms: 50,
                shutdown_grace_ms: 300,
            },
            client: fast_client(),
            engine: EngineConfig {
                program: STUB.to_string(),
                args: stub_args(&[]),
                working_dir: Some(root.path().to_path_buf()),
            },
            ..PoolConfig::default()
        };
        Self { config, root }
    }

    /// Append extra `sentistub` flags to every spawned worker.
    pub(crate) fn flags(mut self, flags: &[&str]) -> Self {
        self.config.engine.args = stub_args(flags);
        self
    }

    /// Replace the mode argument (`trinary` is the only one the stub accepts).
    pub(crate) fn mode(mut self, mode: &str) -> Self {
        if let Some(arg) = self.config.engine.args.iter_mut().find(|a| a.as_str() == "trinary") {
            *arg = mode.to_string();
        }
        self
    }

    pub(crate) fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }
}

pub(crate) fn stub_args(flags: &[&str]) -> Vec<String> {
    ["sentidata", "{data_dir}", "listen", "{port}", "trinary"]
        .iter()
        .chain(flags)
        .map(|s| s.to_string())
        .collect()
}

pub(crate) fn fast_client() -> ClientConfig {
    ClientConfig {
        connect_timeout_ms: 300,
        io_timeout_ms: 5000,
        ..ClientConfig::default()
    }
}

pub(crate) fn probe() -> HealthProbe {
    HealthProbe::new(&fast_client())
}

pub(crate) fn en() -> LanguageCode {
    LanguageCode::new("EN").expect("EN is valid")
}

/// SIGKILL a worker's whole process group, bypassing the pool.
#[cfg(unix)]
pub(crate) fn kill_group(pid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;
    let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
}
