//! Flat text log consumed by the surrounding application.

use std::cell::RefCell;

pub trait LogSink {
    fn on_log(&self, message: &str);
}

/// Forwards every line to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn on_log(&self, message: &str) {
        tracing::info!(target: "siggen::panel", "{message}");
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: RefCell<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl LogSink for MemoryLog {
    fn on_log(&self, message: &str) {
        self.lines.borrow_mut().push(message.to_string());
    }
}
