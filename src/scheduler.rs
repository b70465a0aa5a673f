//! Wall-clock aligned periodic scheduler.
//!
//! Ticks fire on multiples of the sampling interval within the minute
//! (e.g. :00, :05, :10 for a 5 s interval). The next fire time is recomputed
//! from the wall clock after every tick, so slow ticks do not accumulate drift
//! and never overlap.

use chrono::{DateTime, Duration, Local, Timelike};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// First interval-aligned instant strictly after `after`.
pub fn next_fire_time(after: DateTime<Local>, interval_secs: u32) -> DateTime<Local> {
    let interval = interval_secs.max(1);
    let whole = after.with_nanosecond(0).unwrap_or(after);
    let step = interval - whole.second() % interval;
    whole + Duration::seconds(i64::from(step))
}

/// Stops a running [`Scheduler`] after its in-flight tick.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    wake: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Full means a wake-up is already pending.
        let _ = self.wake.try_send(());
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Single-threaded cooperative timer.
pub struct Scheduler {
    interval_secs: u32,
    stopped: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Scheduler {
    pub fn new(interval_secs: u32) -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            interval_secs: interval_secs.max(1),
            stopped: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stopped: self.stopped.clone(),
            wake: self.wake_tx.clone(),
        }
    }

    pub fn interval_secs(&self) -> u32 {
        self.interval_secs
    }

    /// Call `on_tick` with each aligned fire time until stopped.
    ///
    /// Returns the number of ticks run.
    pub fn run<F>(&self, mut on_tick: F) -> u64
    where
        F: FnMut(DateTime<Local>),
    {
        let mut target = next_fire_time(Local::now(), self.interval_secs);
        let mut ticks = 0u64;

        tracing::info!(
            interval_secs = self.interval_secs,
            first_tick = %target.format("%H:%M:%S"),
            "Scheduler started"
        );

        while !self.stopped.load(Ordering::SeqCst) {
            let now = Local::now();
            if now < target {
                let wait = (target - now).to_std().unwrap_or_default();
                match self.wake_rx.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            on_tick(target);
            ticks += 1;

            let after = std::cmp::max(target, Local::now());
            let next = next_fire_time(after, self.interval_secs);
            if next - target > Duration::seconds(i64::from(self.interval_secs)) {
                tracing::warn!(
                    missed = %target.format("%H:%M:%S"),
                    "Tick overran its interval; skipping to the next aligned time"
                );
            }
            target = next;
        }

        tracing::info!(ticks, "Scheduler stopped");
        ticks
    }
}
