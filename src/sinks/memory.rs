//! In-memory sinks.
//!
//! These keep everything they receive so a caller can inspect what the
//! engine produced, e.g. in dry runs or tests.

use crate::sinks::{LogError, LogSink, NotificationSink, Record, SendError};
use chrono::{DateTime, Local};

/// A record captured by [`MemoryLog`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub topic: String,
    pub timestamp: DateTime<Local>,
    pub record: Record,
    pub header: String,
}

/// Log sink that keeps every record.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    pub entries: Vec<LogEntry>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for one topic, in append order.
    pub fn topic(&self, topic: &str) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.topic == topic).collect()
    }
}

impl LogSink for MemoryLog {
    fn append(
        &mut self,
        topic: &str,
        timestamp: DateTime<Local>,
        record: &Record,
        header: &str,
    ) -> Result<(), LogError> {
        self.entries.push(LogEntry {
            topic: topic.to_string(),
            timestamp,
            record: record.clone(),
            header: header.to_string(),
        });
        Ok(())
    }
}

/// Notifier that records every message, optionally failing each send.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    /// Successfully delivered (topic, message) pairs
    pub sent: Vec<(String, String)>,
    /// Number of send attempts, delivered or not
    pub attempts: usize,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose transport always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Delivered messages for one topic.
    pub fn messages(&self, topic: &str) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, m)| m.as_str())
            .collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn send(&mut self, topic: &str, message: &str) -> Result<(), SendError> {
        self.attempts += 1;
        if self.fail {
            return Err(SendError::Transport("simulated transport failure".to_string()));
        }
        self.sent.push((topic.to_string(), message.to_string()));
        Ok(())
    }
}
