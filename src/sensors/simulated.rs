//! Simulated sources for running without hardware attached.
//!
//! Both sources are deterministic: the same sequence of calls produces the
//! same readings, which keeps dry runs reproducible.

use crate::sensors::types::{
    EnvReading, EnvSource, EnvUnits, ReadError, Sample, SampleSource, SampleStatus,
};
use chrono::Local;

/// Vacuum that wobbles around a fixed level, like a fan under gusty wind.
#[derive(Debug, Clone)]
pub struct SimulatedPressure {
    level: f64,
    amplitude: f64,
    step: u64,
}

impl SimulatedPressure {
    pub fn new(level: f64, amplitude: f64) -> Self {
        Self {
            level,
            amplitude,
            step: 0,
        }
    }
}

impl Default for SimulatedPressure {
    fn default() -> Self {
        Self::new(2.0, 0.05)
    }
}

impl SampleSource for SimulatedPressure {
    fn read(&mut self) -> Result<Sample, ReadError> {
        let phase = self.step as f64 * 0.1;
        self.step = self.step.wrapping_add(1);

        Ok(Sample {
            value: self.level + self.amplitude * phase.sin(),
            timestamp: Local::now(),
            status: Some(SampleStatus::Normal),
            temperature_c: Some(21.0),
        })
    }
}

/// Indoor air readings drifting slowly within typical ranges.
#[derive(Debug, Clone, Default)]
pub struct SimulatedEnv {
    step: u64,
}

impl SimulatedEnv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvSource for SimulatedEnv {
    fn read(&mut self) -> Result<EnvReading, ReadError> {
        let phase = self.step as f64 * 0.05;
        self.step = self.step.wrapping_add(1);

        Ok(EnvReading {
            timestamp: Local::now(),
            radon_short_term: 1.2 + 0.4 * phase.sin(),
            radon_long_term: 1.1,
            voc: 120.0 + 40.0 * phase.cos(),
            co2: 600.0 + 100.0 * phase.sin(),
            temperature: 68.0 + 2.0 * phase.cos(),
            humidity: 45.0 + 5.0 * phase.sin(),
            pressure: 1013.0,
            units: EnvUnits::default(),
        })
    }
}
