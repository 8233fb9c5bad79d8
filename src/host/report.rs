//! User-facing message sinks.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Severity of a reported message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageType::Info => "INFO",
            MessageType::Warning => "WARNING",
            MessageType::Error => "ERROR",
        })
    }
}

/// Destination for messages meant for the user, as opposed to diagnostics.
pub trait Reporter: Send + Sync {
    fn report(&self, message: &str, kind: MessageType);
}

/// Forwards messages to `tracing` at the matching level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, message: &str, kind: MessageType) {
        match kind {
            MessageType::Info => tracing::info!(target: "usd_collections::report", "{}", message),
            MessageType::Warning => tracing::warn!(target: "usd_collections::report", "{}", message),
            MessageType::Error => tracing::error!(target: "usd_collections::report", "{}", message),
        }
    }
}

/// Prints info to stdout and everything else to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, message: &str, kind: MessageType) {
        match kind {
            MessageType::Info => println!("{}", message),
            _ => eprintln!("[{}] {}", kind, message),
        }
    }
}

/// Keeps every message in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<(MessageType, String)>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all messages so far.
    pub fn messages(&self) -> Vec<(MessageType, String)> {
        self.messages.lock().clone()
    }

    /// Drain all messages.
    pub fn take(&self) -> Vec<(MessageType, String)> {
        std::mem::take(&mut *self.messages.lock())
    }

    /// Number of messages of `kind`.
    pub fn count(&self, kind: MessageType) -> usize {
        self.messages.lock().iter().filter(|(k, _)| *k == kind).count()
    }

    /// True if any message of `kind` contains `needle`.
    pub fn contains(&self, kind: MessageType, needle: &str) -> bool {
        self.messages
            .lock()
            .iter()
            .any(|(k, m)| *k == kind && m.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, message: &str, kind: MessageType) {
        self.messages.lock().push((kind, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.report("first", MessageType::Info);
        reporter.report("second", MessageType::Error);
        assert_eq!(reporter.count(MessageType::Info), 1);
        assert!(reporter.contains(MessageType::Error, "sec"));
        assert!(!reporter.contains(MessageType::Info, "sec"));
        let taken = reporter.take();
        assert_eq!(taken[0], (MessageType::Info, "first".to_string()));
        assert!(reporter.messages().is_empty());
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(MessageType::Info.to_string(), "INFO");
        assert_eq!(MessageType::Warning.to_string(), "WARNING");
    }
}
