// src/engine/mod.rs

//! Supervision engine.
//!
//! - [`spec`] holds the immutable inputs ([`ServiceSpec`], [`SupervisorPolicy`]).
//! - [`runner`] drives one service's process through its lifecycle.
//! - [`supervisor`] owns every runner, runs one monitor loop per service and
//!   owns the shutdown flag.
//!
//! Callers that embed the engine can subscribe to [`ServiceEvent`]s; `run`
//! returns one [`ServiceReport`] per service.

use std::time::Duration;

use crate::exec::ExitOutcome;

pub mod runner;
pub mod spec;
pub mod supervisor;

pub use runner::{ServiceRunner, ServiceState, StartOutcome};
pub use spec::{ServiceSpec, SupervisorPolicy};
pub use supervisor::Supervisor;

/// What released a service's readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyVia {
    /// No port configured; ready once spawned.
    Spawned,
    /// The port accepted a connection.
    PortOpen,
    /// The port timeout elapsed first.
    PortTimeout,
}

/// Lifecycle notifications, in the order they happen for a given service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    WaitingOnDependency {
        service: String,
        dependency: String,
    },
    Started {
        service: String,
        pid: Option<u32>,
        /// 1-based start attempt.
        attempt: u32,
    },
    Ready {
        service: String,
        via: ReadyVia,
    },
    Exited {
        service: String,
        outcome: ExitOutcome,
    },
    SpawnFailed {
        service: String,
        error: String,
    },
    Restarting {
        service: String,
        attempt: u32,
        max: u32,
        delay: Duration,
    },
    GaveUp {
        service: String,
        restarts: u32,
    },
    Stopped {
        service: String,
    },
}

impl ServiceEvent {
    pub fn service(&self) -> &str {
        match self {
            ServiceEvent::WaitingOnDependency { service, .. }
            | ServiceEvent::Started { service, .. }
            | ServiceEvent::Ready { service, .. }
            | ServiceEvent::Exited { service, .. }
            | ServiceEvent::SpawnFailed { service, .. }
            | ServiceEvent::Restarting { service, .. }
            | ServiceEvent::GaveUp { service, .. }
            | ServiceEvent::Stopped { service } => service,
        }
    }
}

/// Why a service's monitor loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    RestartsExhausted,
}

/// Final summary of one service's supervision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReport {
    pub name: String,
    /// Start attempts, including failed spawns.
    pub starts: u32,
    /// Restarts actually performed.
    pub restarts: u32,
    pub reason: StopReason,
}
