//! Sensor drivers for the Radon Monitor.
//!
//! This module provides the pressure transducer driver and simulated
//! sources, behind the narrow [`SampleSource`] and [`EnvSource`] traits the
//! monitoring engine consumes.

pub mod abp;
pub mod simulated;
pub mod types;

// Re-export commonly used types
pub use abp::{AbpPart, AbpSensor, DeviceFileBus, FrameBus, PartCodeError};
pub use simulated::{SimulatedEnv, SimulatedPressure};
pub use types::{
    EnvReading, EnvSource, EnvUnits, ReadError, Sample, SampleSource, SampleStatus,
};
