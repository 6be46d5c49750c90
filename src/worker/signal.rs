//! Process-group signalling.
//!
//! Engines are spawned as leaders of their own process group because the
//! launcher may fork (e.g. a JVM wrapper script), so signals go to the whole
//! group rather than the direct child.

use std::process::Child;

use crate::error::{WorkerError, WorkerResult};

/// Ask every process in the child's group to terminate (SIGTERM).
#[cfg(unix)]
pub(crate) fn terminate_group(child: &mut Child) -> WorkerResult<()> {
    send_to_group(child.id(), nix::sys::signal::Signal::SIGTERM)
}

/// Kill every process in the child's group (SIGKILL). Only used for
/// engines that never became ready.
#[cfg(unix)]
pub(crate) fn kill_group(child: &mut Child) -> WorkerResult<()> {
    send_to_group(child.id(), nix::sys::signal::Signal::SIGKILL)
}

#[cfg(unix)]
fn send_to_group(pid: u32, signal: nix::sys::signal::Signal) -> WorkerResult<()> {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| WorkerError::signal(pid, "pid out of range"))?;
    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) => Ok(()),
        // Group already gone
        Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(WorkerError::signal(pid, e.to_string())),
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate_group(child: &mut Child) -> WorkerResult<()> {
    kill_child(child)
}

#[cfg(not(unix))]
pub(crate) fn kill_group(child: &mut Child) -> WorkerResult<()> {
    kill_child(child)
}

#[cfg(not(unix))]
fn kill_child(child: &mut Child) -> WorkerResult<()> {
    match child.kill() {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(WorkerError::signal(child.id(), e.to_string())),
    }
}
