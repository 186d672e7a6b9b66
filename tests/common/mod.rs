#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pguard::engine::{ServiceEvent, ServiceReport, ServiceSpec, Supervisor, SupervisorPolicy};
use pguard::types::ExhaustionPolicy;
use pguard_test_utils::RecordingSink;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Policy with short delays so tests finish quickly.
pub fn fast_policy(max_restarts: u32) -> SupervisorPolicy {
    SupervisorPolicy {
        max_restarts,
        restart_delay: Duration::from_millis(100),
        port_timeout: Duration::from_secs(5),
        on_exhaustion: ExhaustionPolicy::StopService,
    }
}

/// A running supervisor plus everything a test needs to observe it.
pub struct Harness {
    pub supervisor: Arc<Supervisor>,
    pub events: mpsc::UnboundedReceiver<ServiceEvent>,
    pub sink: Arc<RecordingSink>,
    pub cancel: CancellationToken,
    pub run: JoinHandle<Vec<ServiceReport>>,
    pub seen: Vec<ServiceEvent>,
}

impl Harness {
    pub fn start(specs: Vec<ServiceSpec>, policy: SupervisorPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink::new());
        let supervisor = Arc::new(
            Supervisor::new(specs, policy)
                .expect("valid services")
                .with_sink(sink.clone())
                .with_events(tx),
        );
        let cancel = CancellationToken::new();
        let run = {
            let supervisor = Arc::clone(&supervisor);
            let cancel = cancel.clone();
            tokio::spawn(async move { supervisor.run(cancel).await })
        };

        Self {
            supervisor,
            events: rx,
            sink,
            cancel,
            run,
            seen: Vec::new(),
        }
    }

    /// Receive events until one matches `pred`; panics after `within`.
    pub async fn wait_for<F>(&mut self, within: Duration, mut pred: F) -> ServiceEvent
    where
        F: FnMut(&ServiceEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            let event = tokio::time::timeout_at(deadline, self.events.recv())
                .await
                .unwrap_or_else(|_| panic!("no matching event; saw {:#?}", self.seen))
                .expect("event channel closed");
            self.seen.push(event.clone());
            if pred(&event) {
                return event;
            }
        }
    }

    /// Pull everything already queued into `seen`.
    pub fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.seen.push(event);
        }
    }

    /// Wait for `run` to return on its own.
    pub async fn finish(&mut self, within: Duration) -> Vec<ServiceReport> {
        let reports = tokio::time::timeout(within, &mut self.run)
            .await
            .expect("supervisor did not finish in time")
            .expect("run task panicked");
        self.drain();
        reports
    }

    /// Request shutdown and wait for `run` to return.
    pub async fn shutdown(&mut self, within: Duration) -> Vec<ServiceReport> {
        self.supervisor.shutdown();
        self.finish(within).await
    }

    /// Events seen so far for one service.
    pub fn events_for(&self, service: &str) -> Vec<&ServiceEvent> {
        self.seen.iter().filter(|e| e.service() == service).collect()
    }

    /// Index of the first seen event matching `pred`.
    pub fn position<F>(&self, pred: F) -> Option<usize>
    where
        F: FnMut(&ServiceEvent) -> bool,
    {
        self.seen.iter().position(pred)
    }
}

pub fn report<'a>(reports: &'a [ServiceReport], name: &str) -> &'a ServiceReport {
    reports
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no report for {name}"))
}

/// A local port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// A bound listener standing in for a service's open port.
pub async fn open_port() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Live and not a zombie, per `/proc/<pid>/stat`.
pub fn process_alive(pid: i32) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let (_, rest) = stat.rsplit_once(')')?;
            Some(!rest.trim_start().starts_with('Z'))
        })
        .unwrap_or(false)
}

/// Poll until `pid` is gone; `false` if it is still alive after `within`.
pub async fn wait_until_gone(pid: i32, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while process_alive(pid) {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}
