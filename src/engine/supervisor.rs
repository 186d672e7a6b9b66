// src/engine/supervisor.rs

//! The supervisor: one monitor loop per service, joined in `run`.
//!
//! Each loop goes:
//! 1. shutdown requested? stop and end;
//! 2. start (dependency wait, spawn, readiness);
//! 3. wait for exit, racing shutdown (which stops the process), then
//!    SIGTERM whatever is left in the process group;
//! 4. shutdown requested? end;
//! 5. restart budget exhausted? give up (and under `shutdown_all` fire the
//!    shutdown flag);
//! 6. sleep the restart delay, racing shutdown; go to 1.
//!
//! Whatever ends a loop, the service's readiness is fired on the way out so
//! no dependent waits forever.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::dag::DependencyGraph;
use crate::engine::runner::{EventSender, ServiceRunner, StartOutcome};
use crate::engine::spec::{ServiceSpec, SupervisorPolicy};
use crate::engine::{ServiceEvent, ServiceReport, StopReason};
use crate::errors::Result;
use crate::exec::{ConsoleSink, ExitOutcome, OutputSink};
use crate::sync::{ReadinessHandle, ReadinessRegistry, ShutdownFlag, StopSignal};
use crate::types::ExhaustionPolicy;

pub struct Supervisor {
    services: Vec<(ServiceSpec, ReadinessHandle)>,
    policy: SupervisorPolicy,
    registry: Arc<ReadinessRegistry>,
    flag: ShutdownFlag,
    sink: Arc<dyn OutputSink>,
    events: Option<mpsc::UnboundedSender<ServiceEvent>>,
}

impl Supervisor {
    /// Validate the dependency graph and register one readiness signal per
    /// service. A `depends_on` naming no configured service is only warned
    /// about.
    pub fn new(specs: Vec<ServiceSpec>, policy: SupervisorPolicy) -> Result<Self> {
        let graph = DependencyGraph::from_specs(&specs)?;
        for (service, dependency) in graph.unknown_dependencies() {
            warn!(
                service,
                dependency,
                "depends_on names an unknown service; starting without waiting"
            );
        }

        let mut registry = ReadinessRegistry::new();
        let services = specs
            .into_iter()
            .map(|spec| {
                let handle = registry.register(&spec.name);
                (spec, handle)
            })
            .collect();

        Ok(Self {
            services,
            policy,
            registry: Arc::new(registry),
            flag: ShutdownFlag::new(),
            sink: Arc::new(ConsoleSink),
            events: None,
        })
    }

    /// Replace the console output sink.
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Subscribe to lifecycle events.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ServiceEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn policy(&self) -> &SupervisorPolicy {
        &self.policy
    }

    /// A clone of the shutdown flag, usable after `run` has taken the
    /// supervisor elsewhere.
    pub fn shutdown_handle(&self) -> ShutdownFlag {
        self.flag.clone()
    }

    /// Request shutdown. Only the first call has any effect.
    pub fn shutdown(&self) {
        if self.flag.fire() {
            info!("shutdown requested");
        }
    }

    /// Supervise every service until all monitor loops have ended.
    ///
    /// `cancel` is OR'd with the shutdown flag. Reports come back in service
    /// declaration order. Readiness signals are single-fire, so a supervisor
    /// is meant to be run once.
    pub async fn run(&self, cancel: CancellationToken) -> Vec<ServiceReport> {
        let stop = StopSignal::new(self.flag.clone(), cancel);

        let announcer = {
            let stop = stop.clone();
            tokio::spawn(async move {
                stop.requested().await;
                info!("stopping all services");
            })
        };

        let mut loops = Vec::with_capacity(self.services.len());
        for (spec, readiness) in self.services.iter() {
            let runner = ServiceRunner::new(
                spec.clone(),
                self.policy,
                Arc::clone(&self.registry),
                readiness.clone(),
                Arc::clone(&self.sink),
                EventSender::new(self.events.clone()),
            );
            let name = spec.name.clone();
            let handle = tokio::spawn(supervise(runner, self.policy, stop.clone()));
            loops.push((name, handle));
        }

        let mut reports = Vec::with_capacity(loops.len());
        for (name, handle) in loops {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => error!(service = %name, error = %e, "monitor loop panicked"),
            }
        }

        announcer.abort();
        info!("all services stopped");
        reports
    }
}

async fn supervise(
    mut runner: ServiceRunner,
    policy: SupervisorPolicy,
    stop: StopSignal,
) -> ServiceReport {
    let reason = loop {
        if stop.is_requested() {
            runner.stop().await;
            break StopReason::Shutdown;
        }

        match runner.start(&stop).await {
            Ok(StartOutcome::Started) => {}
            Ok(StartOutcome::Cancelled) => continue,
            Err(e) => {
                error!(service = %runner.name(), error = %e, "failed to start");
            }
        }

        if runner.has_process() {
            let exited = tokio::select! {
                outcome = runner.wait() => Some(outcome),
                _ = stop.requested() => None,
            };
            let outcome = match exited {
                Some(outcome) => outcome,
                None => runner.stop().await.unwrap_or(ExitOutcome::Unknown),
            };
            runner.exited(outcome);
            // Reap whatever the leader left behind in its group before the
            // next start or the end of the loop.
            runner.stop().await;
        }

        if stop.is_requested() {
            runner.stop().await;
            break StopReason::Shutdown;
        }

        if !runner.should_restart(policy.max_restarts) {
            runner.give_up();
            if policy.on_exhaustion == ExhaustionPolicy::ShutdownAll && stop.flag().fire() {
                warn!(
                    service = %runner.name(),
                    "restart budget exhausted; shutting down all services"
                );
            }
            break StopReason::RestartsExhausted;
        }

        runner.restarting();
        let slept = tokio::select! {
            _ = tokio::time::sleep(policy.restart_delay) => true,
            _ = stop.requested() => false,
        };
        if !slept {
            break StopReason::Shutdown;
        }
    };

    runner.finish(reason == StopReason::Shutdown);

    ServiceReport {
        name: runner.name().to_string(),
        starts: runner.starts(),
        restarts: runner.starts().saturating_sub(1),
        reason,
    }
}
