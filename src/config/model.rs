// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::spec::{ServiceSpec, SupervisorPolicy};
use crate::types::{DisplayColor, ExhaustionPolicy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [supervisor]
/// max_restarts = 5
/// restart_delay = "2s"
/// port_timeout = "30s"
/// on_exhaustion = "stop_service"
///
/// [[service]]
/// name = "db"
/// command = "pg_ctl"
/// args = ["start"]
/// port = 5432
///
/// [[service]]
/// name = "api"
/// command = "cargo"
/// args = ["run"]
/// dir = "./api"
/// depends_on = "db"
/// ```
///
/// This is the unvalidated shape; convert it into a [`ConfigFile`] with
/// `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global restart/readiness policy from `[supervisor]`.
    #[serde(default)]
    pub supervisor: SupervisorSection,

    /// All services from `[[service]]`, in declaration order.
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceConfig>,
}

/// `[supervisor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// Restart attempts per service. `0` disables restarts.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,

    /// Duration string such as `"2s"` or `"500ms"`.
    #[serde(default = "default_restart_delay")]
    pub restart_delay: String,

    /// Duration string; how long a port probe may take before giving up.
    #[serde(default = "default_port_timeout")]
    pub port_timeout: String,

    #[serde(default)]
    pub on_exhaustion: ExhaustionPolicy,
}

fn default_max_restarts() -> u32 {
    5
}

fn default_restart_delay() -> String {
    "2s".to_string()
}

fn default_port_timeout() -> String {
    "30s".to_string()
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            max_restarts: default_max_restarts(),
            restart_delay: default_restart_delay(),
            port_timeout: default_port_timeout(),
            on_exhaustion: ExhaustionPolicy::default(),
        }
    }
}

/// `[[service]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    /// Executable to run (looked up on `PATH`).
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory. Relative paths are resolved against the directory
    /// containing the config file.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub host: Option<String>,

    /// `0` (the default) means "no readiness probe".
    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub depends_on: Option<String>,

    /// Output colour; assigned from the palette when omitted.
    #[serde(default)]
    pub color: Option<DisplayColor>,
}

/// A validated configuration: unique names, acyclic dependencies, parsed
/// durations and resolved colours.
///
/// Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    policy: SupervisorPolicy,
    services: Vec<ServiceSpec>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(policy: SupervisorPolicy, services: Vec<ServiceSpec>) -> Self {
        Self { policy, services }
    }

    pub fn policy(&self) -> &SupervisorPolicy {
        &self.policy
    }

    pub fn services(&self) -> &[ServiceSpec] {
        &self.services
    }

    /// Override the exhaustion behaviour (used by `--fail-fast`).
    pub fn set_on_exhaustion(&mut self, on_exhaustion: ExhaustionPolicy) {
        self.policy.on_exhaustion = on_exhaustion;
    }

    pub fn into_parts(self) -> (SupervisorPolicy, Vec<ServiceSpec>) {
        (self.policy, self.services)
    }
}
