use std::sync::Mutex;

use pguard::exec::{OutputSink, ServiceLabel};

/// Output sink that keeps every relayed line in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(service, line)` pairs seen so far.
    pub fn lines(&self) -> Vec<(String, String)> {
        self.lines.lock().expect("sink mutex poisoned").clone()
    }

    /// Lines relayed for one service, in arrival order.
    pub fn lines_for(&self, service: &str) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(name, _)| name == service)
            .map(|(_, line)| line)
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn line(&self, service: &ServiceLabel, line: &str) {
        self.lines
            .lock()
            .expect("sink mutex poisoned")
            .push((service.name.clone(), line.to_string()));
    }
}
