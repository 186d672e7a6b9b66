// src/sync/readiness.rs

//! Per-service readiness signals.
//!
//! Every service gets one single-fire signal. Its owning runner fires it once
//! the service is usable (port reachable, probe timed out, or process spawned
//! when no port is configured); dependents block in [`ReadinessRegistry::wait`]
//! until then. Firing is idempotent and a waiter arriving after the fire
//! proceeds immediately.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

/// Owner-side handle to one service's readiness signal.
#[derive(Debug, Clone)]
pub struct ReadinessHandle {
    name: Arc<str>,
    tx: Arc<watch::Sender<bool>>,
}

impl ReadinessHandle {
    /// Fire the signal. Returns `true` only for the call that moved it from
    /// pending to fired; later calls are no-ops returning `false`.
    pub fn fire(&self) -> bool {
        let was_fired = self.tx.send_replace(true);
        if !was_fired {
            trace!(service = %self.name, "readiness fired");
        }
        !was_fired
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Name → readiness signal map, filled once before supervision starts and
/// shared read-only afterwards.
#[derive(Debug, Default)]
pub struct ReadinessRegistry {
    signals: HashMap<String, ReadinessHandle>,
}

impl ReadinessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` and return its owner handle. Registering the same name
    /// twice returns a handle to the same signal.
    pub fn register(&mut self, name: &str) -> ReadinessHandle {
        self.signals
            .entry(name.to_string())
            .or_insert_with(|| ReadinessHandle {
                name: Arc::from(name),
                tx: Arc::new(watch::channel(false).0),
            })
            .clone()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// `false` for unknown names.
    pub fn is_fired(&self, name: &str) -> bool {
        self.signals.get(name).is_some_and(ReadinessHandle::is_fired)
    }

    /// Block until `name` has fired. Returns immediately if it already fired
    /// or if `name` was never registered.
    pub async fn wait(&self, name: &str) {
        let Some(handle) = self.signals.get(name) else {
            return;
        };
        let mut rx = handle.tx.subscribe();
        // The sender lives in `self`, so this can only return once fired.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
