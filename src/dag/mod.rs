// src/dag/mod.rs

//! Service dependency graph.
//!
//! [`graph`] validates `depends_on` edges (unique names, no self-reference,
//! no cycles) and computes a start order for dry runs.

pub mod graph;

pub use graph::DependencyGraph;
