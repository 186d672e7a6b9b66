// src/engine/spec.rs

//! Immutable inputs to the supervision engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::types::{DisplayColor, ExhaustionPolicy};

/// Host probed when a service declares a port but no host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// One supervised service, as handed to the engine once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Unique identifier; also the key of the service's readiness signal.
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    /// Working directory; `None` runs in the supervisor's own directory.
    pub dir: Option<PathBuf>,
    pub host: String,
    /// Port probed for readiness; `0` disables the probe.
    pub port: u16,
    /// Name of the service that must be ready before this one starts.
    pub depends_on: Option<String>,
    pub color: DisplayColor,
}

impl ServiceSpec {
    /// A service with no port, no dependency and the first palette colour.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            dir: None,
            host: DEFAULT_HOST.to_string(),
            port: 0,
            depends_on: None,
            color: DisplayColor::for_index(0),
        }
    }

    pub fn has_port(&self) -> bool {
        self.port > 0
    }

    /// `host:port` string used for TCP probing.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Restart and readiness policy shared by every service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorPolicy {
    /// Restart attempts allowed per service; `0` means never restart.
    pub max_restarts: u32,
    /// Pause between a crash and the next start attempt.
    pub restart_delay: Duration,
    /// Longest time a port probe waits before releasing dependents anyway.
    pub port_timeout: Duration,
    pub on_exhaustion: ExhaustionPolicy,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            restart_delay: Duration::from_secs(2),
            port_timeout: Duration::from_secs(30),
            on_exhaustion: ExhaustionPolicy::StopService,
        }
    }
}
