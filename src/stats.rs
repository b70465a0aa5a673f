//! Run statistics.
//!
//! Counters describing what the monitor has done, shared between the
//! scheduler thread and whoever prints the summary on shutdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current run.
#[derive(Debug)]
pub struct RunStats {
    /// Pressure samples read successfully
    samples_read: AtomicU64,
    /// Samples that were missing or invalid
    samples_absent: AtomicU64,
    /// Averaging windows flushed
    windows_flushed: AtomicU64,
    /// Environmental readings taken
    env_reads: AtomicU64,
    /// Alert conditions detected
    alerts_raised: AtomicU64,
    /// Notifications handed to the transport
    notifications_sent: AtomicU64,
    /// Alerts held back by a throttle
    notifications_throttled: AtomicU64,
    /// Notifications the transport rejected
    send_failures: AtomicU64,
    /// Log records that could not be written
    log_failures: AtomicU64,
    /// Run start time
    run_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            samples_read: AtomicU64::new(0),
            samples_absent: AtomicU64::new(0),
            windows_flushed: AtomicU64::new(0),
            env_reads: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_throttled: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            log_failures: AtomicU64::new(0),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that continue from, and save back to, `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous run stats: {e}");
        }

        stats
    }

    pub fn record_sample(&self) {
        self.samples_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_absent_sample(&self) {
        self.samples_absent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_flushed(&self) {
        self.windows_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_env_read(&self) {
        self.env_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_throttled(&self) {
        self.notifications_throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_failure(&self) {
        self.log_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_read: self.samples_read.load(Ordering::Relaxed),
            samples_absent: self.samples_absent.load(Ordering::Relaxed),
            windows_flushed: self.windows_flushed.load(Ordering::Relaxed),
            env_reads: self.env_reads.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_throttled: self.notifications_throttled.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            log_failures: self.log_failures.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_secs: (Utc::now() - self.run_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Run Statistics:\n\
             - Samples read: {}\n\
             - Samples missing: {}\n\
             - Windows flushed: {}\n\
             - Environmental reads: {}\n\
             - Alerts raised: {}\n\
             - Notifications sent: {}\n\
             - Notifications throttled: {}\n\
             - Send failures: {}\n\
             - Log failures: {}\n\
             - Run duration: {} seconds",
            s.samples_read,
            s.samples_absent,
            s.windows_flushed,
            s.env_reads,
            s.alerts_raised,
            s.notifications_sent,
            s.notifications_throttled,
            s.send_failures,
            s.log_failures,
            s.run_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let s = self.snapshot();
            let persisted = PersistedStats {
                samples_read: s.samples_read,
                samples_absent: s.samples_absent,
                windows_flushed: s.windows_flushed,
                env_reads: s.env_reads,
                alerts_raised: s.alerts_raised,
                notifications_sent: s.notifications_sent,
                notifications_throttled: s.notifications_throttled,
                send_failures: s.send_failures,
                log_failures: s.log_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let p: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_read.store(p.samples_read, Ordering::Relaxed);
                self.samples_absent.store(p.samples_absent, Ordering::Relaxed);
                self.windows_flushed.store(p.windows_flushed, Ordering::Relaxed);
                self.env_reads.store(p.env_reads, Ordering::Relaxed);
                self.alerts_raised.store(p.alerts_raised, Ordering::Relaxed);
                self.notifications_sent
                    .store(p.notifications_sent, Ordering::Relaxed);
                self.notifications_throttled
                    .store(p.notifications_throttled, Ordering::Relaxed);
                self.send_failures.store(p.send_failures, Ordering::Relaxed);
                self.log_failures.store(p.log_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_read: u64,
    pub samples_absent: u64,
    pub windows_flushed: u64,
    pub env_reads: u64,
    pub alerts_raised: u64,
    pub notifications_sent: u64,
    pub notifications_throttled: u64,
    pub send_failures: u64,
    pub log_failures: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_read: u64,
    samples_absent: u64,
    windows_flushed: u64,
    env_reads: u64,
    alerts_raised: u64,
    notifications_sent: u64,
    notifications_throttled: u64,
    send_failures: u64,
    #[serde(default)]
    log_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared run statistics.
pub type SharedStats = Arc<RunStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(RunStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStats {
    Arc::new(RunStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = RunStats::new();
        stats.record_sample();
        stats.record_sample();
        stats.record_absent_sample();
        stats.record_throttled();
        stats.record_send_failure();

        let s = stats.snapshot();
        assert_eq!(s.samples_read, 2);
        assert_eq!(s.samples_absent, 1);
        assert_eq!(s.notifications_throttled, 1);
        assert_eq!(s.alerts_raised, 0);
        assert_eq!(s.send_failures, 1);
        assert_eq!(s.log_failures, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = RunStats::new();
        let summary = stats.summary();
        assert!(summary.contains("Samples read: 0"));
        assert!(summary.contains("Notifications throttled"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "radon-monitor-stats-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let stats = RunStats::with_persistence(path.clone());
        stats.record_window_flushed();
        stats.record_alert();
        stats.record_notification();
        stats.record_log_failure();
        stats.save().unwrap();

        let restored = RunStats::with_persistence(path.clone());
        let s = restored.snapshot();
        assert_eq!(s.windows_flushed, 1);
        assert_eq!(s.alerts_raised, 1);
        assert_eq!(s.notifications_sent, 1);
        assert_eq!(s.send_failures, 0);
        assert_eq!(s.log_failures, 1);

        let _ = std::fs::remove_file(&path);
    }
}
