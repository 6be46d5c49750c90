//! Lifecycle of individual engine processes.

mod process;
mod signal;
mod state;

pub use process::WorkerProcess;
pub use state::WorkerState;
