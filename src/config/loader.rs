// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization and resolves relative working
/// directories against the config file's directory; it does **not** perform
/// semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let mut config: RawConfigFile = toml::from_str(&contents)?;
    resolve_service_dirs(&mut config, &config_root_dir(path));

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - duplicate or empty service names,
///   - self-referencing or cyclic `depends_on`,
///   - missing working directories,
///   - malformed durations.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Default config path: `pguard.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("pguard.toml")
}

/// Directory that relative `dir` entries are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "dev/pguard.toml"),
///   we use that directory.
/// - If it's just a bare filename like "pguard.toml" (parent = ""),
///   relative dirs stay relative to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn resolve_service_dirs(config: &mut RawConfigFile, root: &Path) {
    for svc in config.services.iter_mut() {
        if let Some(dir) = svc.dir.as_mut() {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
    }
}
