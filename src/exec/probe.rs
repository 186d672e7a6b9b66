// src/exec/probe.rs

//! TCP reachability probe used as the readiness check for services with a port.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::trace;

use crate::sync::StopSignal;

/// Pause between connection attempts.
pub const PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on a single connection attempt.
pub const DIAL_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// A connection succeeded.
    Ready,
    /// `deadline` elapsed without a successful connection.
    TimedOut,
    /// Shutdown was requested first.
    Cancelled,
}

/// Poll `addr` until it accepts a TCP connection, `deadline` passes, or
/// `stop` is requested.
pub async fn wait_for_port(addr: &str, deadline: Duration, stop: &StopSignal) -> ProbeOutcome {
    let attempts = async {
        loop {
            if dial(addr).await {
                return;
            }
            sleep(PROBE_INTERVAL).await;
        }
    };

    tokio::select! {
        res = timeout(deadline, attempts) => match res {
            Ok(()) => ProbeOutcome::Ready,
            Err(_) => ProbeOutcome::TimedOut,
        },
        _ = stop.requested() => ProbeOutcome::Cancelled,
    }
}

async fn dial(addr: &str) -> bool {
    match timeout(DIAL_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            trace!(%addr, error = %e, "probe attempt refused");
            false
        }
        Err(_) => {
            trace!(%addr, "probe attempt timed out");
            false
        }
    }
}
