#![allow(dead_code)]

use std::path::PathBuf;

use pguard::config::{ConfigFile, RawConfigFile, ServiceConfig};
use pguard::engine::ServiceSpec;
use pguard::types::{DisplayColor, ExhaustionPolicy};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.config.services.push(service);
        self
    }

    pub fn max_restarts(mut self, n: u32) -> Self {
        self.config.supervisor.max_restarts = n;
        self
    }

    pub fn restart_delay(mut self, d: &str) -> Self {
        self.config.supervisor.restart_delay = d.to_string();
        self
    }

    pub fn port_timeout(mut self, d: &str) -> Self {
        self.config.supervisor.port_timeout = d.to_string();
        self
    }

    pub fn on_exhaustion(mut self, policy: ExhaustionPolicy) -> Self {
        self.config.supervisor.on_exhaustion = policy;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ServiceSpec`, also able to produce the matching
/// `ServiceConfig` for config-level tests.
pub struct ServiceSpecBuilder {
    spec: ServiceSpec,
}

impl ServiceSpecBuilder {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            spec: ServiceSpec::new(name, command),
        }
    }

    /// Run `script` through `sh -c`.
    pub fn shell(name: &str, script: &str) -> Self {
        Self::new(name, "sh").args(&["-c", script])
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.spec.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spec.dir = Some(dir.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.spec.port = port;
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.spec.host = host.to_string();
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.spec.depends_on = Some(dep.to_string());
        self
    }

    pub fn color(mut self, color: DisplayColor) -> Self {
        self.spec.color = color;
        self
    }

    pub fn build(self) -> ServiceSpec {
        self.spec
    }

    pub fn build_config(self) -> ServiceConfig {
        let spec = self.spec;
        ServiceConfig {
            name: spec.name,
            command: spec.command,
            args: spec.args,
            dir: spec.dir,
            host: Some(spec.host),
            port: spec.port,
            depends_on: spec.depends_on,
            color: None,
        }
    }
}
