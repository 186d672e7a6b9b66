// src/config/mod.rs

//! Configuration loading and validation for pguard.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants like unique names and an acyclic `depends_on`
//!   graph, producing the engine's `ServiceSpec`s (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile, ServiceConfig, SupervisorSection};
