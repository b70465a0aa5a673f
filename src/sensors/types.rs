//! Reading types produced by the sensor drivers.
//!
//! The monitoring engine only ever sees these types; the drivers behind
//! [`SampleSource`] and [`EnvSource`] own all bus and radio details.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Status reported alongside a pressure sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleStatus {
    /// Normal operation, valid data
    Normal,
    /// Device in command mode
    CommandMode,
    /// Data already fetched since the last measurement cycle
    Stale,
    /// Diagnostic condition
    Diagnostic,
}

impl SampleStatus {
    /// Decode the two status bits of a transducer frame.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => SampleStatus::Normal,
            1 => SampleStatus::CommandMode,
            2 => SampleStatus::Stale,
            _ => SampleStatus::Diagnostic,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            SampleStatus::Normal => 0,
            SampleStatus::CommandMode => 1,
            SampleStatus::Stale => 2,
            SampleStatus::Diagnostic => 3,
        }
    }
}

/// A single scalar reading from the pressure channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Vacuum in inches of water column
    pub value: f64,
    /// When the sample was taken
    pub timestamp: DateTime<Local>,
    /// Device status, if the transducer reports one
    pub status: Option<SampleStatus>,
    /// Sensor die temperature in degrees Celsius, if read
    pub temperature_c: Option<f64>,
}

impl Sample {
    /// Create a sample with no status or temperature.
    pub fn new(value: f64, timestamp: DateTime<Local>) -> Self {
        Self {
            value,
            timestamp,
            status: None,
            temperature_c: None,
        }
    }

    /// Whether this sample may be averaged.
    ///
    /// Samples without a status are trusted; otherwise only `Normal` counts.
    pub fn is_valid(&self) -> bool {
        matches!(self.status, None | Some(SampleStatus::Normal)) && self.value.is_finite()
    }
}

/// Units for each environmental channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvUnits {
    pub radon: String,
    pub voc: String,
    pub co2: String,
    pub temperature: String,
    pub humidity: String,
    pub pressure: String,
}

impl Default for EnvUnits {
    fn default() -> Self {
        Self {
            radon: "pCi/L".to_string(),
            voc: "ppb".to_string(),
            co2: "ppm".to_string(),
            temperature: "degF".to_string(),
            humidity: "%rH".to_string(),
            pressure: "hPa".to_string(),
        }
    }
}

/// One reading from the environmental device, one value per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvReading {
    pub timestamp: DateTime<Local>,
    /// Radon short-term average
    pub radon_short_term: f64,
    /// Radon long-term average
    pub radon_long_term: f64,
    pub voc: f64,
    pub co2: f64,
    pub temperature: f64,
    pub humidity: f64,
    /// Relative atmospheric pressure
    pub pressure: f64,
    pub units: EnvUnits,
}

impl EnvReading {
    /// Values in CSV column order.
    pub fn values(&self) -> [f64; 7] {
        [
            self.radon_short_term,
            self.radon_long_term,
            self.voc,
            self.co2,
            self.temperature,
            self.humidity,
            self.pressure,
        ]
    }

    /// CSV header declaring column names and units, matching [`EnvReading::values`].
    pub fn header(units: &EnvUnits) -> String {
        format!(
            "Radon ST avg ({}),Radon LT avg ({}),VOC level ({}),CO2 level ({}),\
             Temperature ({}),Humidity ({}),Pressure ({})",
            units.radon,
            units.radon,
            units.voc,
            units.co2,
            units.temperature,
            units.humidity,
            units.pressure
        )
    }

    /// Human-readable values with units.
    pub fn describe(&self) -> String {
        let u = &self.units;
        format!(
            "Radon ST {:.1} {} | Radon LT {:.1} {} | VOC {:.0} {} | CO2 {:.0} {} | \
             Temp {:.1} {} | RH {:.1} {} | Press {:.1} {}",
            self.radon_short_term,
            u.radon,
            self.radon_long_term,
            u.radon,
            self.voc,
            u.voc,
            self.co2,
            u.co2,
            self.temperature,
            u.temperature,
            self.humidity,
            u.humidity,
            self.pressure,
            u.pressure
        )
    }
}

/// Errors a sensor read can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    /// The bus or radio transfer failed
    Transport(String),
    /// The device answered but the raw counts are outside the valid output band
    OutOfRange { counts: u16 },
    /// The device could not be located
    NotFound,
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Transport(e) => write!(f, "transport error: {e}"),
            ReadError::OutOfRange { counts } => {
                write!(f, "reading out of decode range ({counts} counts)")
            }
            ReadError::NotFound => write!(f, "sensor not found"),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        ReadError::Transport(e.to_string())
    }
}

/// A source of pressure samples, read once per scheduler tick.
pub trait SampleSource {
    fn read(&mut self) -> Result<Sample, ReadError>;
}

/// A source of environmental readings.
pub trait EnvSource {
    fn read(&mut self) -> Result<EnvReading, ReadError>;
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn read(&mut self) -> Result<Sample, ReadError> {
        (**self).read()
    }
}

impl<T: EnvSource + ?Sized> EnvSource for Box<T> {
    fn read(&mut self) -> Result<EnvReading, ReadError> {
        (**self).read()
    }
}
