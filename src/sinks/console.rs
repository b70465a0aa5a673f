//! Console notifier.
//!
//! Used when no remote transport is configured: messages go to the
//! `tracing` output so the operator still sees them.

use crate::sinks::{NotificationSink, SendError};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationSink for ConsoleNotifier {
    fn send(&mut self, topic: &str, message: &str) -> Result<(), SendError> {
        tracing::warn!(topic, "{message}");
        Ok(())
    }
}
