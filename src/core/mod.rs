//! Core functionality for the Radon Monitor.
//!
//! This module contains:
//! - Window averaging of pressure samples
//! - Baseline calibration and delta alerting for the pressure channel
//! - Bracket classification with hysteresis for environmental channels

pub mod averaging;
pub mod brackets;
pub mod calibration;
pub mod channel;
pub mod delta;

// Re-export commonly used types
pub use averaging::{Averager, FlushError, DEFAULT_PARTIAL_FRACTION};
pub use brackets::{
    classify_humidity, evaluate_channel, Bracket, BracketAlertEvaluator, BracketError,
    BracketEvaluation, BracketTable, ChannelAlertState, ChannelOutcome, Classifier,
    DEFAULT_CHANNEL_THROTTLE_SECS,
};
pub use calibration::{BaselineCalibrator, CalibrationStatus};
pub use channel::{AlertEvent, Channel};
pub use delta::{DeltaAlertEvaluator, DeltaClass, DeltaLimits};
