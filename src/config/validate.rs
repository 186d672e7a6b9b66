// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, RawConfigFile, ServiceConfig};
use crate::dag::DependencyGraph;
use crate::engine::spec::{DEFAULT_HOST, ServiceSpec, SupervisorPolicy};
use crate::errors::{PguardError, Result};
use crate::types::{DisplayColor, parse_duration};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PguardError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let policy = build_policy(&raw)?;
        let services: Vec<ServiceSpec> = raw
            .services
            .into_iter()
            .enumerate()
            .map(|(index, svc)| build_spec(index, svc))
            .collect();

        // Unique names, no self-reference, no cycles.
        DependencyGraph::from_specs(&services)?;

        Ok(ConfigFile::new_unchecked(policy, services))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_services(cfg)?;
    validate_service_fields(cfg)?;
    Ok(())
}

fn ensure_has_services(cfg: &RawConfigFile) -> Result<()> {
    if cfg.services.is_empty() {
        return Err(PguardError::Config(
            "config must contain at least one [[service]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_service_fields(cfg: &RawConfigFile) -> Result<()> {
    for svc in cfg.services.iter() {
        if svc.name.trim().is_empty() {
            return Err(PguardError::Config(
                "every [[service]] needs a non-empty `name`".to_string(),
            ));
        }
        if svc.command.trim().is_empty() {
            return Err(PguardError::Config(format!(
                "service '{}' has an empty `command`",
                svc.name
            )));
        }
        if let Some(dir) = &svc.dir {
            if !dir.is_dir() {
                return Err(PguardError::Config(format!(
                    "service '{}' has working directory {:?} which is not a directory",
                    svc.name, dir
                )));
            }
        }
    }
    Ok(())
}

fn build_policy(cfg: &RawConfigFile) -> Result<SupervisorPolicy> {
    let section = &cfg.supervisor;
    Ok(SupervisorPolicy {
        max_restarts: section.max_restarts,
        restart_delay: duration_field("restart_delay", &section.restart_delay)?,
        port_timeout: duration_field("port_timeout", &section.port_timeout)?,
        on_exhaustion: section.on_exhaustion,
    })
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| PguardError::Config(format!("[supervisor].{field}: {e}")))
}

fn build_spec(index: usize, svc: ServiceConfig) -> ServiceSpec {
    ServiceSpec {
        color: svc.color.unwrap_or_else(|| DisplayColor::for_index(index)),
        host: svc
            .host
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        depends_on: svc.depends_on.filter(|d| !d.is_empty()),
        name: svc.name,
        command: svc.command,
        args: svc.args,
        dir: svc.dir,
        port: svc.port,
    }
}
