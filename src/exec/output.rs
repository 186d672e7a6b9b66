// src/exec/output.rs

//! Output relay from service processes to a display sink.
//!
//! The supervisor never interprets output. Each running process gets one
//! relay task that reads stdout and stderr line by line and hands every line
//! to an [`OutputSink`] together with the service's [`ServiceLabel`].

use std::sync::Arc;

use chrono::Local;
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{ChildStderr, ChildStdout};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::engine::spec::ServiceSpec;
use crate::types::DisplayColor;

/// Name and colour used to tag a service's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLabel {
    pub name: String,
    pub color: DisplayColor,
}

impl ServiceLabel {
    pub fn from_spec(spec: &ServiceSpec) -> Self {
        Self {
            name: spec.name.clone(),
            color: spec.color,
        }
    }
}

/// Consumer of service output lines.
///
/// Production code uses [`ConsoleSink`]; tests can record lines instead.
pub trait OutputSink: Send + Sync {
    fn line(&self, service: &ServiceLabel, line: &str);
}

/// Prints `HH:MM:SS [name] line` to stdout with the name in its colour.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn line(&self, service: &ServiceLabel, line: &str) {
        let tag = format!("[{}]", service.name);
        println!(
            "{} {} {}",
            Local::now().format("%H:%M:%S"),
            tag.color(service.color.ansi()),
            line
        );
    }
}

/// Which pipe a relayed line came from.
#[derive(Debug, Clone, Copy)]
enum Pipe {
    Stdout,
    Stderr,
}

/// Spawn the relay task for one process instance.
///
/// The task ends when both pipes reach EOF, which normally happens when the
/// process (and every child still holding the pipes) has exited.
pub fn spawn_relay(
    label: ServiceLabel,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    sink: Arc<dyn OutputSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut out = stdout.map(|s| BufReader::new(s).lines());
        let mut err = stderr.map(|s| BufReader::new(s).lines());

        while out.is_some() || err.is_some() {
            let (pipe, line) = tokio::select! {
                line = next_line(&mut out), if out.is_some() => (Pipe::Stdout, line),
                line = next_line(&mut err), if err.is_some() => (Pipe::Stderr, line),
            };

            match (pipe, line) {
                (_, Some(line)) => sink.line(&label, &line),
                (Pipe::Stdout, None) => out = None,
                (Pipe::Stderr, None) => err = None,
            }
        }

        trace!(service = %label.name, "output relay ended");
    })
}

/// Next line from an optional reader; `None` on EOF or read error.
async fn next_line<R>(lines: &mut Option<Lines<R>>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}
