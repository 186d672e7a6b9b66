// src/sync/mod.rs

//! Single-fire coordination primitives shared between service tasks.
//!
//! - [`readiness`] holds one readiness signal per service name.
//! - [`shutdown`] holds the global shutdown flag and its combination with
//!   external cancellation.
//!
//! These are the only pieces of state more than one task touches.

pub mod readiness;
pub mod shutdown;

pub use readiness::{ReadinessHandle, ReadinessRegistry};
pub use shutdown::{ShutdownFlag, StopSignal};
