//! Lifecycle states for one engine process.

/// State of an engine process owned by a [`super::WorkerProcess`].
///
/// Transitions:
/// - NotStarted -> Starting (spawned, waiting for a probe to succeed)
/// - Starting -> Ready (probe answered)
/// - Starting -> Failed (spawn error, early exit or attempts exhausted)
/// - Ready -> Stopping (terminate sent to the process group)
/// - Stopping -> Stopped (port no longer answers)
/// - Stopping -> Ready (port still answers after the grace period)
///
/// Stopped and Failed are terminal; a new process needs a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    NotStarted,
    Starting,
    Ready,
    Stopping,
    Stopped,
    Failed,
}

impl WorkerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Stopped | WorkerState::Failed)
    }
}
