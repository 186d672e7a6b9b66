// src/sync/shutdown.rs

//! Process-wide shutdown signalling.
//!
//! Two independent sources can ask the supervisor to stop:
//! - the [`ShutdownFlag`], owned by the supervisor and fired by
//!   `Supervisor::shutdown` or by a service exhausting its restart budget
//!   under `shutdown_all`;
//! - an external [`CancellationToken`], typically cancelled on SIGINT/SIGTERM.
//!
//! [`StopSignal`] ORs the two and is what every suspension point races.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// Single-fire broadcast flag. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the flag. Safe under concurrent callers; returns `true` only for
    /// the one call that actually fired it.
    pub fn fire(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::SeqCst);
        self.token.cancel();
        first
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the flag has fired (immediately if it already has).
    pub async fn fired(&self) {
        self.token.cancelled().await
    }
}

/// The flag and the external cancellation, logically OR'd.
#[derive(Debug, Clone)]
pub struct StopSignal {
    flag: ShutdownFlag,
    external: CancellationToken,
}

impl StopSignal {
    pub fn new(flag: ShutdownFlag, external: CancellationToken) -> Self {
        Self { flag, external }
    }

    pub fn is_requested(&self) -> bool {
        self.flag.is_fired() || self.external.is_cancelled()
    }

    /// Resolves as soon as either source fires.
    pub async fn requested(&self) {
        tokio::select! {
            _ = self.flag.fired() => {}
            _ = self.external.cancelled() => {}
        }
    }

    pub fn flag(&self) -> &ShutdownFlag {
        &self.flag
    }
}
