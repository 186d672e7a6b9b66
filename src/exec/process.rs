// src/exec/process.rs

//! One run attempt of a service's command.
//!
//! Every process is spawned as the leader of a fresh process group so that
//! termination can reach anything it forked. Termination is cooperative: a
//! single SIGTERM to the group, then wait.

use std::fmt;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::spec::ServiceSpec;
use crate::errors::{PguardError, Result};
use crate::exec::output::{OutputSink, ServiceLabel, spawn_relay};

/// How long to let the relay flush trailing output after the process exits.
const RELAY_DRAIN: Duration = Duration::from_millis(250);

/// How a process instance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Code(i32),
    Signal(i32),
    /// The status could not be determined.
    Unknown,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Code(0))
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            ExitOutcome::Code(code)
        } else if let Some(sig) = status.signal() {
            ExitOutcome::Signal(sig)
        } else {
            ExitOutcome::Unknown
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Code(code) => write!(f, "exit code {code}"),
            ExitOutcome::Signal(sig) => match Signal::try_from(*sig) {
                Ok(signal) => write!(f, "killed by {}", signal.as_str()),
                Err(_) => write!(f, "killed by signal {sig}"),
            },
            ExitOutcome::Unknown => write!(f, "unknown exit status"),
        }
    }
}

/// Live handle to a spawned service process.
#[derive(Debug)]
pub struct RunningProcess {
    service: String,
    child: Child,
    pid: Option<u32>,
    relay: Option<JoinHandle<()>>,
    signalled: bool,
}

impl RunningProcess {
    /// Spawn `spec`'s command in its own process group with output relayed
    /// to `sink`.
    pub fn spawn(spec: &ServiceSpec, sink: Arc<dyn OutputSink>) -> Result<Self> {
        info!(
            service = %spec.name,
            command = %spec.command,
            args = ?spec.args,
            dir = ?spec.dir,
            "starting"
        );

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(dir) = &spec.dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| PguardError::Spawn {
            service: spec.name.clone(),
            source,
        })?;

        let pid = child.id();
        let relay = spawn_relay(
            ServiceLabel::from_spec(spec),
            child.stdout.take(),
            child.stderr.take(),
            sink,
        );

        info!(service = %spec.name, pid, "started");

        Ok(Self {
            service: spec.name.clone(),
            child,
            pid,
            relay: Some(relay),
            signalled: false,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the process to exit. Cancel-safe.
    pub async fn wait(&mut self) -> ExitOutcome {
        let outcome = match self.child.wait().await {
            Ok(status) => ExitOutcome::from(status),
            Err(e) => {
                warn!(service = %self.service, error = %e, "failed to wait for process");
                ExitOutcome::Unknown
            }
        };
        self.drain_relay().await;
        outcome
    }

    /// Send SIGTERM to the process group (at most once per instance) and wait
    /// for the leader to exit.
    ///
    /// The group is signalled even when the leader has already exited, so
    /// anything it left running in the background goes down with it.
    pub async fn terminate(&mut self) -> ExitOutcome {
        if !self.signalled {
            self.signalled = true;
            if let Some(pid) = self.pid {
                if matches!(self.child.try_wait(), Ok(Some(_))) {
                    debug!(
                        service = %self.service,
                        pid,
                        "leader gone; signalling leftover group"
                    );
                } else {
                    info!(service = %self.service, pid, "stopping");
                }
                self.signal_group(pid);
            }
        }

        self.wait().await
    }

    fn signal_group(&self, pid: u32) {
        let Ok(raw) = i32::try_from(pid) else {
            warn!(service = %self.service, pid, "pid out of range; cannot signal group");
            return;
        };
        match killpg(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => {}
            Err(Errno::ESRCH) => {
                debug!(service = %self.service, pid, "process group already gone");
            }
            Err(e) => {
                warn!(service = %self.service, pid, error = %e, "failed to signal process group");
            }
        }
    }

    /// Give the relay a moment to flush. A grandchild may keep the pipes open
    /// after the leader exits; the relay is then left to finish on its own.
    async fn drain_relay(&mut self) {
        if let Some(mut relay) = self.relay.take() {
            if tokio::time::timeout(RELAY_DRAIN, &mut relay).await.is_err() {
                debug!(service = %self.service, "output still open after exit");
            }
        }
    }
}
