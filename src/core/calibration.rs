//! Baseline calibration.
//!
//! The first `cal_count` window averages are folded into the baseline as
//! `value += avg / cal_count`. After the last one the baseline is frozen for
//! the lifetime of the process.

use serde::{Deserialize, Serialize};

/// Result of feeding one average to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationStatus {
    /// Still calibrating; this many averages remain
    Calibrating(u32),
    /// This average completed calibration
    Completed,
    /// Calibration finished earlier; the average was ignored
    Frozen,
}

impl CalibrationStatus {
    /// Whether the delta evaluator should be bypassed for this average.
    pub fn in_progress(&self) -> bool {
        !matches!(self, CalibrationStatus::Frozen)
    }

    pub fn describe(&self) -> String {
        match self {
            CalibrationStatus::Calibrating(n) => format!("Cal in process {n}"),
            CalibrationStatus::Completed => "Cal completed".to_string(),
            CalibrationStatus::Frozen => String::new(),
        }
    }
}

/// Fixed-length moving-average baseline.
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    value: f64,
    remaining: u32,
    cal_count: u32,
}

impl BaselineCalibrator {
    pub fn new(cal_count: u32) -> Self {
        Self {
            value: 0.0,
            remaining: cal_count,
            cal_count,
        }
    }

    /// Fold one window average into the baseline.
    pub fn observe(&mut self, avg: f64) -> CalibrationStatus {
        if self.remaining == 0 {
            return CalibrationStatus::Frozen;
        }

        self.value += avg / f64::from(self.cal_count);
        self.remaining -= 1;

        if self.remaining == 0 {
            CalibrationStatus::Completed
        } else {
            CalibrationStatus::Calibrating(self.remaining)
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.remaining == 0
    }

    /// The frozen baseline, or `None` while calibration is in progress.
    pub fn baseline(&self) -> Option<f64> {
        self.is_frozen().then_some(self.value)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
