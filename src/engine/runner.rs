// src/engine/runner.rs

//! Lifecycle of a single service.
//!
//! A [`ServiceRunner`] is owned by exactly one monitor loop, so its state has
//! a single writer. The only state it shares is the readiness registry and
//! the stop signal.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::spec::{ServiceSpec, SupervisorPolicy};
use crate::engine::{ReadyVia, ServiceEvent};
use crate::errors::Result;
use crate::exec::{ExitOutcome, OutputSink, ProbeOutcome, RunningProcess, wait_for_port};
use crate::sync::{ReadinessHandle, ReadinessRegistry, StopSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    WaitingOnDependency,
    Starting,
    Running,
    Stopping,
    Exited,
    /// Terminal.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Shutdown was requested before the process could be spawned.
    Cancelled,
}

/// Optional event channel. Sends never block and a closed receiver is ignored.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSender(Option<mpsc::UnboundedSender<ServiceEvent>>);

impl EventSender {
    pub(crate) fn new(tx: Option<mpsc::UnboundedSender<ServiceEvent>>) -> Self {
        Self(tx)
    }

    fn emit(&self, event: ServiceEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.send(event);
        }
    }
}

pub struct ServiceRunner {
    spec: ServiceSpec,
    policy: SupervisorPolicy,
    registry: Arc<ReadinessRegistry>,
    readiness: ReadinessHandle,
    sink: Arc<dyn OutputSink>,
    events: EventSender,
    state: ServiceState,
    process: Option<RunningProcess>,
    /// Pid of the latest instance, kept after `stop` takes the process.
    pid: Option<u32>,
    probe: Option<JoinHandle<()>>,
    restart_count: u32,
    starts: u32,
}

impl ServiceRunner {
    pub(crate) fn new(
        spec: ServiceSpec,
        policy: SupervisorPolicy,
        registry: Arc<ReadinessRegistry>,
        readiness: ReadinessHandle,
        sink: Arc<dyn OutputSink>,
        events: EventSender,
    ) -> Self {
        Self {
            spec,
            policy,
            registry,
            readiness,
            sink,
            events,
            state: ServiceState::Idle,
            process: None,
            pid: None,
            probe: None,
            restart_count: 0,
            starts: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn starts(&self) -> u32 {
        self.starts
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn has_process(&self) -> bool {
        self.process.is_some()
    }

    /// Wait for the dependency (racing `stop`), then spawn the process and
    /// arrange for readiness to fire.
    ///
    /// A spawn failure is returned after the attempt has been counted; the
    /// caller treats it like an immediate exit.
    pub async fn start(&mut self, stop: &StopSignal) -> Result<StartOutcome> {
        if let Some(dep) = self.spec.depends_on.clone() {
            if self.registry.is_registered(&dep) && !self.registry.is_fired(&dep) {
                self.state = ServiceState::WaitingOnDependency;
                info!(service = %self.spec.name, dependency = %dep, "waiting for dependency");
                self.events.emit(ServiceEvent::WaitingOnDependency {
                    service: self.spec.name.clone(),
                    dependency: dep.clone(),
                });

                let released = tokio::select! {
                    _ = self.registry.wait(&dep) => true,
                    _ = stop.requested() => false,
                };
                if !released {
                    return Ok(StartOutcome::Cancelled);
                }
                info!(service = %self.spec.name, dependency = %dep, "dependency ready");
            }
        }

        if stop.is_requested() {
            return Ok(StartOutcome::Cancelled);
        }

        self.state = ServiceState::Starting;
        self.starts += 1;
        self.process = None;
        self.pid = None;

        let process = match RunningProcess::spawn(&self.spec, Arc::clone(&self.sink)) {
            Ok(process) => process,
            Err(e) => {
                self.state = ServiceState::Exited;
                self.events.emit(ServiceEvent::SpawnFailed {
                    service: self.spec.name.clone(),
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        self.events.emit(ServiceEvent::Started {
            service: self.spec.name.clone(),
            pid: process.pid(),
            attempt: self.starts,
        });
        self.pid = process.pid();
        self.process = Some(process);
        self.state = ServiceState::Running;

        if self.spec.has_port() {
            self.spawn_probe(stop);
        } else {
            self.events.emit(ServiceEvent::Ready {
                service: self.spec.name.clone(),
                via: ReadyVia::Spawned,
            });
            self.readiness.fire();
        }

        Ok(StartOutcome::Started)
    }

    /// Probe the port in the background; readiness fires whatever the result.
    /// A probe left over from a previous run is not duplicated.
    fn spawn_probe(&mut self, stop: &StopSignal) {
        if self.probe.as_ref().is_some_and(|p| !p.is_finished()) {
            debug!(service = %self.spec.name, "port probe already running");
            return;
        }

        let service = self.spec.name.clone();
        let addr = self.spec.address();
        let port_timeout = self.policy.port_timeout;
        let stop = stop.clone();
        let readiness = self.readiness.clone();
        let events = self.events.clone();

        debug!(service = %service, %addr, "probing port");
        self.probe = Some(tokio::spawn(async move {
            let via = match wait_for_port(&addr, port_timeout, &stop).await {
                ProbeOutcome::Ready => {
                    info!(service = %service, %addr, "port ready");
                    Some(ReadyVia::PortOpen)
                }
                ProbeOutcome::TimedOut => {
                    warn!(
                        service = %service,
                        %addr,
                        timeout = ?port_timeout,
                        "port not reachable before timeout; releasing dependents anyway"
                    );
                    Some(ReadyVia::PortTimeout)
                }
                ProbeOutcome::Cancelled => None,
            };
            if let Some(via) = via {
                events.emit(ServiceEvent::Ready { service, via });
            }
            readiness.fire();
        }));
    }

    /// Exit status of the current instance; [`ExitOutcome::Unknown`] if there
    /// is none.
    pub async fn wait(&mut self) -> ExitOutcome {
        match self.process.as_mut() {
            Some(process) => process.wait().await,
            None => ExitOutcome::Unknown,
        }
    }

    /// Record and log the end of a run.
    pub fn exited(&mut self, outcome: ExitOutcome) {
        self.state = ServiceState::Exited;
        let pid = self.pid;
        if outcome.is_success() {
            info!(service = %self.spec.name, pid, status = %outcome, "exited");
        } else {
            warn!(service = %self.spec.name, pid, status = %outcome, "exited");
        }
        self.events.emit(ServiceEvent::Exited {
            service: self.spec.name.clone(),
            outcome,
        });
    }

    /// Terminate the current instance, if any. Idempotent.
    pub async fn stop(&mut self) -> Option<ExitOutcome> {
        let mut process = self.process.take()?;
        self.state = ServiceState::Stopping;
        let outcome = process.terminate().await;
        debug!(service = %self.spec.name, status = %outcome, "terminated");
        self.state = ServiceState::Exited;
        Some(outcome)
    }

    /// Count one restart decision; `true` while the count stays within `max`.
    pub fn should_restart(&mut self, max: u32) -> bool {
        self.restart_count += 1;
        self.restart_count <= max
    }

    pub(crate) fn restarting(&self) {
        let delay = self.policy.restart_delay;
        info!(
            service = %self.spec.name,
            delay = ?delay,
            attempt = self.restart_count,
            max = self.policy.max_restarts,
            "restarting"
        );
        self.events.emit(ServiceEvent::Restarting {
            service: self.spec.name.clone(),
            attempt: self.restart_count,
            max: self.policy.max_restarts,
            delay,
        });
    }

    pub(crate) fn give_up(&self) {
        warn!(
            service = %self.spec.name,
            max = self.policy.max_restarts,
            "max restarts exceeded, giving up"
        );
        self.events.emit(ServiceEvent::GaveUp {
            service: self.spec.name.clone(),
            restarts: self.starts.saturating_sub(1),
        });
    }

    /// Enter the terminal state and release dependents still waiting.
    pub(crate) fn finish(&mut self, shutdown: bool) {
        self.state = ServiceState::Stopped;
        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
        if shutdown {
            self.events.emit(ServiceEvent::Stopped {
                service: self.spec.name.clone(),
            });
        }
        if self.readiness.fire() {
            debug!(service = %self.spec.name, "readiness released on termination");
        }
    }
}
