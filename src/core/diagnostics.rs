//! Logging capability handed to the extractors.
//!
//! Extractors never log through a global directly; they receive a
//! `&dyn Diagnostics` so callers decide where messages go. The binary uses
//! [`TracingDiagnostics`], tests use [`MemoryDiagnostics`] to assert on what
//! was reported.

use std::sync::Mutex;

/// Severity of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Warning,
}

/// Sink for debug and warning messages emitted while extracting reports
pub trait Diagnostics {
    fn debug(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Forwards messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    messages: Mutex<Vec<(Level, String)>>,
}

impl MemoryDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages recorded so far, oldest first
    #[must_use]
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Messages of one level
    #[must_use]
    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((level, message.to_string()));
        }
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn warning(&self, message: &str) {
        self.push(Level::Warning, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_diagnostics_records_levels() {
        let diag = MemoryDiagnostics::new();
        diag.debug("first");
        diag.warning("second");
        diag.debug("third");

        assert_eq!(diag.messages().len(), 3);
        assert_eq!(diag.at(Level::Debug), vec!["first", "third"]);
        assert_eq!(diag.at(Level::Warning), vec!["second"]);
    }
}
