//! Window averaging for the pressure channel.
//!
//! Samples are summed over a window of `target_count` readings. The window
//! is flushed on a wall-clock minute boundary once it holds enough samples,
//! so a window shortened by sensor dropout is still accepted.

use crate::sensors::types::Sample;
use chrono::{DateTime, Local, Timelike};

/// Default fraction of the target count a window needs before it may flush.
pub const DEFAULT_PARTIAL_FRACTION: f64 = 0.8;

/// Error returned when flushing an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushError {
    InsufficientSamples,
}

impl std::fmt::Display for FlushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushError::InsufficientSamples => write!(f, "no samples in averaging window"),
        }
    }
}

impl std::error::Error for FlushError {}

/// Running sum over the current averaging window.
#[derive(Debug, Clone)]
pub struct Averager {
    sum: f64,
    count: u32,
    target_count: u32,
    partial_fraction: f64,
}

impl Averager {
    /// Create an averager for windows of `target_count` samples.
    pub fn new(target_count: u32, partial_fraction: f64) -> Self {
        Self {
            sum: 0.0,
            count: 0,
            target_count,
            partial_fraction,
        }
    }

    /// Add a sample to the window.
    pub fn accumulate(&mut self, sample: &Sample) {
        self.sum += sample.value;
        self.count += 1;
    }

    /// Whether `now` is a window boundary and the window holds enough samples.
    pub fn should_flush(&self, now: DateTime<Local>) -> bool {
        now.second() == 0 && self.has_quorum()
    }

    /// Whether the window holds at least the partial fraction of its target.
    pub fn has_quorum(&self) -> bool {
        self.count > 0 && f64::from(self.count) >= f64::from(self.target_count) * self.partial_fraction
    }

    /// Return the window average and reset to an empty window.
    pub fn flush(&mut self) -> Result<f64, FlushError> {
        if self.count == 0 {
            return Err(FlushError::InsufficientSamples);
        }
        let avg = self.sum / f64::from(self.count);
        self.sum = 0.0;
        self.count = 0;
        Ok(avg)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn sample(value: f64) -> Sample {
        Sample::new(value, at(12, 0, 0))
    }

    #[test]
    fn test_flush_returns_mean_and_resets() {
        let mut avg = Averager::new(4, DEFAULT_PARTIAL_FRACTION);
        for v in [1.0, 2.0, 3.0, 4.0] {
            avg.accumulate(&sample(v));
        }
        assert_eq!(avg.count(), 4);
        assert_eq!(avg.flush(), Ok(2.5));
        assert_eq!(avg.count(), 0);
        assert_eq!(avg.sum(), 0.0);
    }

    #[test]
    fn test_flush_empty_window() {
        let mut avg = Averager::new(60, DEFAULT_PARTIAL_FRACTION);
        assert_eq!(avg.flush(), Err(FlushError::InsufficientSamples));
    }

    #[test]
    fn test_should_flush_needs_boundary_and_quorum() {
        let mut avg = Averager::new(60, DEFAULT_PARTIAL_FRACTION);
        for _ in 0..47 {
            avg.accumulate(&sample(2.0));
        }
        assert!(!avg.should_flush(at(12, 1, 0)));

        avg.accumulate(&sample(2.0));
        assert!(avg.should_flush(at(12, 1, 0)));
        assert!(!avg.should_flush(at(12, 1, 1)));
    }

    #[test]
    fn test_window_may_overfill() {
        let mut avg = Averager::new(10, DEFAULT_PARTIAL_FRACTION);
        for _ in 0..25 {
            avg.accumulate(&sample(1.0));
        }
        assert!(avg.count() > avg.target_count());
        assert_eq!(avg.flush(), Ok(1.0));
    }
}
