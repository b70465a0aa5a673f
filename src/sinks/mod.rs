//! Output sinks for the Radon Monitor.
//!
//! The engine writes measurement records to a [`LogSink`] and alert/status
//! text to a [`NotificationSink`]. Neither is allowed to stop the scheduler:
//! failures are returned to the caller, which logs them and moves on.

pub mod console;
pub mod csv_log;
pub mod memory;
#[cfg(feature = "webhook")]
pub mod webhook;

use chrono::{DateTime, Local};

// Re-export commonly used types
pub use console::ConsoleNotifier;
pub use csv_log::{format_record, parse_record, CsvLog};
pub use memory::{LogEntry, MemoryLog, RecordingNotifier};
#[cfg(feature = "webhook")]
pub use webhook::{BlockingWebhookNotifier, WebhookConfig, WebhookNotifier};

/// Topic for averaged pressure records.
pub const PRESSURE_TOPIC: &str = "RadonMonitor/PresSensor";
/// Topic for environmental records.
pub const ENV_TOPIC: &str = "RadonMonitor/WavePlus";
/// Topic for alert notifications.
pub const ALERT_TOPIC: &str = "RadonMonitor/Alert";
/// Topic for status reports.
pub const STATUS_TOPIC: &str = "RadonMonitor/Status";

/// Default value written in place of a missing reading.
pub const DEFAULT_MISSING_SENTINEL: f64 = -99.0;

/// One logged record: a single value or an ordered row of values.
///
/// `None` marks a missing reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Scalar(Option<f64>),
    List(Vec<Option<f64>>),
}

impl Record {
    pub fn values(&self) -> Vec<Option<f64>> {
        match self {
            Record::Scalar(v) => vec![*v],
            Record::List(vs) => vs.clone(),
        }
    }
}

/// Log sink errors.
#[derive(Debug)]
pub enum LogError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for LogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::Io(e) => write!(f, "log IO error: {e}"),
            LogError::Parse(e) => write!(f, "log parse error: {e}"),
        }
    }
}

impl std::error::Error for LogError {}

impl From<std::io::Error> for LogError {
    fn from(e: std::io::Error) -> Self {
        LogError::Io(e.to_string())
    }
}

/// Notification transport errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SendError {
    /// The transport could not deliver the message
    Transport(String),
    /// The remote end refused the message
    Rejected { status: u16, message: String },
    /// No transport is configured
    Disabled,
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Transport(e) => write!(f, "notification transport error: {e}"),
            SendError::Rejected { status, message } => {
                write!(f, "notification rejected ({status}): {message}")
            }
            SendError::Disabled => write!(f, "notifications disabled"),
        }
    }
}

impl std::error::Error for SendError {}

/// Append-only measurement log.
pub trait LogSink {
    fn append(
        &mut self,
        topic: &str,
        timestamp: DateTime<Local>,
        record: &Record,
        header: &str,
    ) -> Result<(), LogError>;
}

/// Outbound alert and status messages.
pub trait NotificationSink {
    fn send(&mut self, topic: &str, message: &str) -> Result<(), SendError>;
}

impl<T: LogSink + ?Sized> LogSink for Box<T> {
    fn append(
        &mut self,
        topic: &str,
        timestamp: DateTime<Local>,
        record: &Record,
        header: &str,
    ) -> Result<(), LogError> {
        (**self).append(topic, timestamp, record, header)
    }
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn send(&mut self, topic: &str, message: &str) -> Result<(), SendError> {
        (**self).send(topic, message)
    }
}
