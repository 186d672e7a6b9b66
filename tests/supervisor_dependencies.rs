// tests/supervisor_dependencies.rs

mod common;

use std::time::{Duration, Instant};

use common::{Harness, closed_port, fast_policy, open_port, report};
use pguard::engine::{ReadyVia, ServiceEvent, StopReason};
use pguard_test_utils::{ServiceSpecBuilder, init_tracing};

fn is_started(e: &ServiceEvent, name: &str) -> bool {
    matches!(e, ServiceEvent::Started { service, .. } if service == name)
}

fn is_ready(e: &ServiceEvent, name: &str) -> bool {
    matches!(e, ServiceEvent::Ready { service, .. } if service == name)
}

/// A listens on a port (held by the test) and crashes repeatedly; B depends
/// on A and must keep running after A gives up.
#[tokio::test]
async fn dependent_starts_after_ready_and_survives_dependency_giving_up() {
    init_tracing();
    let (_listener, port) = open_port().await;

    let a = ServiceSpecBuilder::shell("a", "sleep 0.3; exit 1")
        .port(port)
        .build();
    let b = ServiceSpecBuilder::new("b", "sleep")
        .args(&["30"])
        .depends_on("a")
        .build();

    let mut h = Harness::start(vec![a, b], fast_policy(2));

    h.wait_for(Duration::from_secs(10), |e| {
        matches!(e, ServiceEvent::GaveUp { service, .. } if service == "a")
    })
    .await;

    let a_ready = h.position(|e| is_ready(e, "a")).expect("a became ready");
    let b_started = h.position(|e| is_started(e, "b")).expect("b started");
    assert!(a_ready < b_started, "b started before a was ready");

    // b keeps running once a is gone.
    tokio::time::sleep(Duration::from_millis(300)).await;
    h.drain();
    assert!(
        !h.events_for("b")
            .iter()
            .any(|e| matches!(e, ServiceEvent::Exited { .. })),
        "b should still be running"
    );

    let reports = h.shutdown(Duration::from_secs(5)).await;

    let a = report(&reports, "a");
    assert_eq!(a.starts, 3);
    assert_eq!(a.restarts, 2);
    assert_eq!(a.reason, StopReason::RestartsExhausted);

    let b = report(&reports, "b");
    assert_eq!(b.starts, 1);
    assert_eq!(b.reason, StopReason::Shutdown);
}

#[tokio::test]
async fn services_without_dependencies_start_immediately() {
    init_tracing();
    let specs = (0..3)
        .map(|i| {
            ServiceSpecBuilder::new(&format!("s{i}"), "sleep")
                .args(&["30"])
                .build()
        })
        .collect();

    let started = Instant::now();
    let mut h = Harness::start(specs, fast_policy(0));
    for i in 0..3 {
        let name = format!("s{i}");
        h.wait_for(Duration::from_secs(5), |e| is_started(e, &name)).await;
    }
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(
        !h.seen
            .iter()
            .any(|e| matches!(e, ServiceEvent::WaitingOnDependency { .. }))
    );

    let reports = h.shutdown(Duration::from_secs(5)).await;
    assert!(reports.iter().all(|r| r.reason == StopReason::Shutdown));
}

#[tokio::test]
async fn portless_dependency_is_ready_on_spawn() {
    init_tracing();
    let a = ServiceSpecBuilder::new("a", "sleep").args(&["30"]).build();
    let b = ServiceSpecBuilder::new("b", "sleep")
        .args(&["30"])
        .depends_on("a")
        .build();

    let mut h = Harness::start(vec![a, b], fast_policy(0));
    h.wait_for(Duration::from_secs(5), |e| is_started(e, "b")).await;

    assert!(h.seen.contains(&ServiceEvent::Ready {
        service: "a".to_string(),
        via: ReadyVia::Spawned,
    }));

    h.shutdown(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn unreachable_port_releases_dependents_after_timeout() {
    init_tracing();
    let port = closed_port().await;

    let a = ServiceSpecBuilder::new("a", "sleep")
        .args(&["30"])
        .port(port)
        .build();
    let b = ServiceSpecBuilder::new("b", "sleep")
        .args(&["30"])
        .depends_on("a")
        .build();

    let mut policy = fast_policy(0);
    policy.port_timeout = Duration::from_secs(1);

    let began = Instant::now();
    let mut h = Harness::start(vec![a, b], policy);
    h.wait_for(Duration::from_secs(10), |e| is_started(e, "b")).await;
    let waited = began.elapsed();

    assert!(waited >= Duration::from_millis(900), "released too early: {waited:?}");
    assert!(waited < Duration::from_secs(3), "released too late: {waited:?}");
    assert!(h.seen.contains(&ServiceEvent::Ready {
        service: "a".to_string(),
        via: ReadyVia::PortTimeout,
    }));

    h.shutdown(Duration::from_secs(5)).await;
}

#[tokio::test]
async fn unknown_dependency_does_not_block() {
    init_tracing();
    let a = ServiceSpecBuilder::shell("a", "echo hello from a")
        .depends_on("ghost")
        .build();

    let mut h = Harness::start(vec![a], fast_policy(0));
    let reports = h.finish(Duration::from_secs(5)).await;

    assert_eq!(report(&reports, "a").starts, 1);
    assert!(
        !h.seen
            .iter()
            .any(|e| matches!(e, ServiceEvent::WaitingOnDependency { .. }))
    );
    assert_eq!(h.sink.lines_for("a"), vec!["hello from a".to_string()]);
}

#[tokio::test]
async fn dependency_that_never_starts_still_releases_dependents() {
    init_tracing();
    let a = ServiceSpecBuilder::new("a", "/definitely/not/a/binary").build();
    let b = ServiceSpecBuilder::new("b", "true").depends_on("a").build();

    let mut h = Harness::start(vec![a, b], fast_policy(0));
    let reports = h.finish(Duration::from_secs(5)).await;

    let a = report(&reports, "a");
    assert_eq!(a.starts, 1);
    assert_eq!(a.reason, StopReason::RestartsExhausted);
    assert_eq!(report(&reports, "b").starts, 1);

    assert!(
        h.seen
            .iter()
            .any(|e| matches!(e, ServiceEvent::SpawnFailed { service, .. } if service == "a"))
    );
}
