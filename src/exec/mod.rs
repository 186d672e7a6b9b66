// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] spawns one run attempt of a service in its own process group
//!   and terminates it with a group-wide SIGTERM.
//! - [`output`] relays the process's stdout/stderr to an [`OutputSink`].
//! - [`probe`] checks TCP reachability of a service's port.

pub mod output;
pub mod probe;
pub mod process;

pub use output::{ConsoleSink, OutputSink, ServiceLabel};
pub use probe::{ProbeOutcome, wait_for_port};
pub use process::{ExitOutcome, RunningProcess};
