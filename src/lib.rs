// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod sync;
pub mod types;

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::dag::DependencyGraph;
use crate::engine::Supervisor;
use crate::types::ExhaustionPolicy;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the `--fail-fast` override
/// - SIGINT/SIGTERM → cancellation
/// - the supervisor, until every service loop has ended
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.as_path();
    let mut cfg = load_and_validate(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    if args.fail_fast {
        cfg.set_on_exhaustion(ExhaustionPolicy::ShutdownAll);
    }

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let (policy, services) = cfg.into_parts();
    info!(
        services = services.len(),
        max_restarts = policy.max_restarts,
        restart_delay = ?policy.restart_delay,
        port_timeout = ?policy.port_timeout,
        on_exhaustion = ?policy.on_exhaustion,
        "starting supervisor"
    );

    let supervisor = Supervisor::new(services, policy)?;

    let cancel = CancellationToken::new();
    spawn_signal_relay(cancel.clone())?;

    let reports = supervisor.run(cancel).await;
    for report in reports.iter() {
        debug!(
            service = %report.name,
            starts = report.starts,
            restarts = report.restarts,
            reason = ?report.reason,
            "supervision ended"
        );
    }

    Ok(())
}

/// Cancel `cancel` on the first SIGINT or SIGTERM.
fn spawn_signal_relay(cancel: CancellationToken) -> Result<()> {
    let mut term = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    tokio::spawn(async move {
        let received = tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => "SIGINT",
                Err(e) => {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
            },
            _ = term.recv() => "SIGTERM",
        };
        info!(signal = received, "received termination signal");
        cancel.cancel();
    });

    Ok(())
}

/// Simple dry-run output: print policy, services, deps and start order.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let policy = cfg.policy();
    println!("pguard dry-run");
    println!("  supervisor.max_restarts = {}", policy.max_restarts);
    println!("  supervisor.restart_delay = {:?}", policy.restart_delay);
    println!("  supervisor.port_timeout = {:?}", policy.port_timeout);
    println!("  supervisor.on_exhaustion = {:?}", policy.on_exhaustion);
    println!();

    println!("services ({}):", cfg.services().len());
    for svc in cfg.services() {
        println!("  - {}", svc.name);
        println!("      command: {}", svc.command);
        if !svc.args.is_empty() {
            println!("      args: {:?}", svc.args);
        }
        if let Some(ref dir) = svc.dir {
            println!("      dir: {}", dir.display());
        }
        if svc.has_port() {
            println!("      probe: {}", svc.address());
        }
        if let Some(ref dep) = svc.depends_on {
            println!("      depends_on: {dep}");
        }
        println!("      color: {:?}", svc.color);
    }
    println!();

    let graph = DependencyGraph::from_specs(cfg.services())?;
    for (service, dependency) in graph.unknown_dependencies() {
        println!("warning: '{service}' depends on unknown service '{dependency}'");
    }
    println!("start order: {}", graph.start_order()?.join(" -> "));

    debug!("dry-run complete (nothing started)");
    Ok(())
}
