use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use super::WorkerState;
use super::signal::{kill_group, terminate_group};
use crate::config::{EngineConfig, WorkerSettings};
use crate::error::{WorkerError, WorkerResult};
use crate::language::LanguageCode;
use crate::probe::HealthProbe;

/// One spawned engine process bound to a port and a language.
///
/// Owned by the pool that created it. A handle that reached `Stopped` or
/// `Failed` never talks to its port again; the port itself may be handed to
/// a new handle.
#[derive(Debug)]
pub struct WorkerProcess {
    language: LanguageCode,
    port: u16,
    child: Option<Child>,
    pid: Option<u32>,
    state: WorkerState,
}

impl WorkerProcess {
    pub fn new(language: LanguageCode, port: u16) -> Self {
        Self {
            language,
            port,
            child: None,
            pid: None,
            state: WorkerState::NotStarted,
        }
    }

    pub fn language(&self) -> LanguageCode {
        self.language
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Whether the port currently answers probes.
    pub fn is_live(&self, probe: &HealthProbe) -> bool {
        probe.exists(self.port)
    }

    /// Spawn the engine and wait until it answers a probe.
    ///
    /// Refuses to spawn if the port already answers, since that engine was
    /// started by someone else. Polls readiness at most
    /// `settings.startup_attempts` times with a fixed backoff, so this never
    /// blocks indefinitely. An engine that does not become ready is killed
    /// and the handle ends in `Failed`.
    pub fn start(
        &mut self,
        engine: &EngineConfig,
        settings: &WorkerSettings,
        probe: &HealthProbe,
    ) -> WorkerResult<()> {
        match self.state {
            WorkerState::NotStarted => {}
            WorkerState::Ready => return Ok(()),
            state => return Err(WorkerError::InvalidState { state }),
        }

        if probe.exists(self.port) {
            log::info!(
                target: "sentipool::worker",
                "Engine at port {} already exists, not spawning",
                self.port
            );
            return Err(WorkerError::PortInUse { port: self.port });
        }

        let base = engine
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let data_dir = self.language.data_dir_in(&base);
        if !data_dir.is_dir() {
            self.state = WorkerState::Failed;
            return Err(WorkerError::MissingLanguageData { path: data_dir });
        }

        self.state = WorkerState::Starting;
        let mut child = match self.spawn(engine, &base) {
            Ok(child) => child,
            Err(e) => {
                self.state = WorkerState::Failed;
                return Err(e);
            }
        };
        let pid = child.id();
        self.pid = Some(pid);

        log::debug!(
            target: "sentipool::worker",
            "Spawned engine {} for {} at port {}",
            pid,
            self.language,
            self.port
        );

        match self.await_ready(&mut child, settings, probe) {
            Ok(()) => {
                log::info!(
                    target: "sentipool::worker",
                    "Started instance {} at port {}",
                    pid,
                    self.port
                );
                self.child = Some(child);
                self.state = WorkerState::Ready;
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    target: "sentipool::worker",
                    "Failed to start {} engine at port {}: {}",
                    self.language,
                    self.port,
                    e
                );
                abandon(&mut child);
                self.state = WorkerState::Failed;
                Err(e)
            }
        }
    }

    fn spawn(&self, engine: &EngineConfig, base: &Path) -> WorkerResult<Child> {
        let mut command = Command::new(&engine.program);
        command
            .args(engine.render_args(self.language, self.port))
            .current_dir(base)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command.spawn().map_err(|source| WorkerError::Spawn {
            program: engine.program.clone(),
            source,
        })
    }

    fn await_ready(
        &self,
        child: &mut Child,
        settings: &WorkerSettings,
        probe: &HealthProbe,
    ) -> WorkerResult<()> {
        let attempts = settings.startup_attempts;
        for attempt in 1..=attempts {
            thread::sleep(settings.startup_backoff());

            if probe.exists(self.port) {
                return Ok(());
            }
            if let Ok(Some(status)) = child.try_wait() {
                return Err(WorkerError::ExitedEarly {
                    port: self.port,
                    status,
                });
            }
            log::trace!(
                target: "sentipool::worker",
                "Port {} not ready (attempt {}/{})",
                self.port,
                attempt,
                attempts
            );
        }
        Err(WorkerError::StartupTimeout {
            port: self.port,
            attempts,
        })
    }

    /// Terminate the process group and confirm the port went quiet.
    ///
    /// Sends SIGTERM to the whole group, waits `grace`, then probes. If the
    /// port still answers the handle goes back to `Ready` and
    /// [`WorkerError::ShutdownIncomplete`] is returned; nothing is force-killed.
    /// Stopping a handle that never started or already stopped is a no-op.
    pub fn stop(&mut self, grace: Duration, probe: &HealthProbe) -> WorkerResult<()> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };
        let pid = child.id();
        let previous = self.state;
        self.state = WorkerState::Stopping;

        if let Err(e) = terminate_group(child) {
            self.state = previous;
            return Err(e);
        }
        thread::sleep(grace);
        // Reap if it exited; a still-running child is reported below
        if let Err(e) = child.try_wait() {
            log::debug!(
                target: "sentipool::worker",
                "Unable to reap engine {} at port {}: {}",
                pid,
                self.port,
                e
            );
        }

        if probe.exists(self.port) {
            self.state = previous;
            return Err(WorkerError::ShutdownIncomplete {
                port: self.port,
                pid,
            });
        }

        log::info!(
            target: "sentipool::worker",
            "Stopped instance {} at port {}",
            pid,
            self.port
        );
        self.child = None;
        self.state = WorkerState::Stopped;
        Ok(())
    }
}

/// Kill and reap an engine that never became ready.
fn abandon(child: &mut Child) {
    if let Err(e) = kill_group(child) {
        log::warn!(target: "sentipool::worker", "{}", e);
        return;
    }
    if let Err(e) = child.wait() {
        log::debug!(target: "sentipool::worker", "Unable to reap abandoned engine: {}", e);
    }
}
