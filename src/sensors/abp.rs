//! Amplified basic pressure (ABP) transducer driver.
//!
//! A part is selected by the six-character code taken from the middle of the
//! order number, e.g. `ABPDANN060MG2A3` -> `"060MG2"`:
//!
//! ```text
//! 060 M G 2
//!  |  | | +--> S = SPI, 1..7 = I2C address (n << 4) | 0x08
//!  |  | +----> D = differential, G = gage
//!  |  +------> unit: M mbar, B bar, K kPa, G MPa, P psi
//!  +---------> full-scale range
//! ```
//!
//! Frames are two bytes (status + 14-bit pressure) or four bytes (plus
//! 11-bit temperature).

use crate::sensors::types::{ReadError, Sample, SampleSource, SampleStatus};
use chrono::Local;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Output counts at 10% of supply.
pub const OUTPUT_MIN: u16 = 1638;
/// Output counts at 90% of supply.
pub const OUTPUT_MAX: u16 = 14745;

/// Pressure unit of a part's full-scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureUnit {
    Mbar,
    Bar,
    KPa,
    MPa,
    Psi,
}

impl PressureUnit {
    fn from_code(c: char) -> Option<Self> {
        match c {
            'M' => Some(PressureUnit::Mbar),
            'B' => Some(PressureUnit::Bar),
            'K' => Some(PressureUnit::KPa),
            'G' => Some(PressureUnit::MPa),
            'P' => Some(PressureUnit::Psi),
            _ => None,
        }
    }

    /// Multiplier converting this unit to inches of water column.
    pub fn to_inches_wc(&self) -> f64 {
        match self {
            PressureUnit::Mbar => 0.401865,
            PressureUnit::Bar => 401.865,
            PressureUnit::KPa => 4.01865,
            PressureUnit::MPa => 4018.65,
            PressureUnit::Psi => 27.679904842545,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PressureUnit::Mbar => "mbar",
            PressureUnit::Bar => "bar",
            PressureUnit::KPa => "kPa",
            PressureUnit::MPa => "MPa",
            PressureUnit::Psi => "psi",
        }
    }
}

/// Bus the part is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Spi,
    I2c { address: u8 },
}

/// Errors parsing a part code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartCodeError {
    Length(usize),
    Range(String),
    Unit(char),
    Kind(char),
    Bus(char),
}

impl std::fmt::Display for PartCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartCodeError::Length(n) => write!(f, "part code must be 6 characters, got {n}"),
            PartCodeError::Range(r) => write!(f, "invalid pressure range '{r}' (1 - 600)"),
            PartCodeError::Unit(c) => write!(f, "unknown pressure unit '{c}'"),
            PartCodeError::Kind(c) => write!(f, "expected D (differential) or G (gage), got '{c}'"),
            PartCodeError::Bus(c) => write!(f, "expected S (SPI) or I2C address 1 - 7, got '{c}'"),
        }
    }
}

impl std::error::Error for PartCodeError {}

/// Decoded description of a transducer part.
#[derive(Debug, Clone, PartialEq)]
pub struct AbpPart {
    pub pressure_min: f64,
    pub pressure_max: f64,
    pub unit: PressureUnit,
    pub differential: bool,
    pub bus: BusKind,
}

/// One decoded frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbpFrame {
    pub status: SampleStatus,
    /// Pressure in the part's native unit
    pub pressure: f64,
    pub temperature_c: Option<f64>,
}

impl AbpPart {
    /// Parse a six-character part code such as `"060MG2"` or `"001PDS"`.
    pub fn parse(code: &str) -> Result<Self, PartCodeError> {
        let chars: Vec<char> = code.trim().chars().collect();
        if chars.len() != 6 {
            return Err(PartCodeError::Length(chars.len()));
        }

        let range_str: String = chars[..3].iter().collect();
        let range: f64 = range_str
            .parse::<u16>()
            .ok()
            .filter(|r| (1..=600).contains(r))
            .map(f64::from)
            .ok_or_else(|| PartCodeError::Range(range_str.clone()))?;

        let unit = PressureUnit::from_code(chars[3]).ok_or(PartCodeError::Unit(chars[3]))?;

        let differential = match chars[4] {
            'D' => true,
            'G' => false,
            other => return Err(PartCodeError::Kind(other)),
        };

        let bus = match chars[5] {
            'S' => BusKind::Spi,
            c => match c.to_digit(10) {
                Some(d @ 1..=7) => BusKind::I2c {
                    address: ((d as u8) << 4) | 0x08,
                },
                _ => return Err(PartCodeError::Bus(c)),
            },
        };

        Ok(Self {
            pressure_min: if differential { -range } else { 0.0 },
            pressure_max: range,
            unit,
            differential,
            bus,
        })
    }

    /// Decode a two- or four-byte frame.
    ///
    /// Counts outside the 10%-90% output band are rejected for frames with
    /// `Normal` status; other statuses are passed through for the caller to
    /// discard.
    pub fn decode(&self, frame: &[u8]) -> Result<AbpFrame, ReadError> {
        if frame.len() < 2 {
            return Err(ReadError::Transport(format!(
                "short frame ({} bytes)",
                frame.len()
            )));
        }

        let status = SampleStatus::from_bits((frame[0] & 0xC0) >> 6);
        let counts = (u16::from(frame[0] & 0x3F) << 8) | u16::from(frame[1]);

        if status == SampleStatus::Normal && !(OUTPUT_MIN..=OUTPUT_MAX).contains(&counts) {
            return Err(ReadError::OutOfRange { counts });
        }

        let pressure = (f64::from(counts) - f64::from(OUTPUT_MIN))
            * (self.pressure_max - self.pressure_min)
            / f64::from(OUTPUT_MAX - OUTPUT_MIN)
            + self.pressure_min;

        let temperature_c = if frame.len() >= 4 {
            let raw = (u16::from(frame[2]) << 3) | (u16::from(frame[3] & 0xE0) >> 5);
            Some(f64::from(raw) * 200.0 / 2047.0 - 50.0)
        } else {
            None
        };

        Ok(AbpFrame {
            status,
            pressure,
            temperature_c,
        })
    }

    /// Convert a native-unit pressure to inches of water column.
    pub fn to_inches_wc(&self, pressure: f64) -> f64 {
        pressure * self.unit.to_inches_wc()
    }

    pub fn describe(&self) -> String {
        let bus = match self.bus {
            BusKind::Spi => "SPI".to_string(),
            BusKind::I2c { address } => format!("i2c address: {address:#04x}"),
        };
        format!(
            "Range: {:.1} to {:.1} {} {} {}",
            self.pressure_min,
            self.pressure_max,
            self.unit.as_str(),
            if self.differential { "diff" } else { "gage" },
            bus
        )
    }
}

/// Raw frame transport.
pub trait FrameBus {
    /// Fill `buf` with one frame from the device.
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<(), ReadError>;
}

/// Reads frames from a character device such as `/dev/spidev0.0`.
///
/// The file is opened lazily and reopened after a failed transfer.
pub struct DeviceFileBus {
    path: PathBuf,
    file: Option<File>,
}

impl DeviceFileBus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }
}

impl FrameBus for DeviceFileBus {
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<(), ReadError> {
        if self.file.is_none() {
            let file = File::open(&self.path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ReadError::NotFound,
                _ => ReadError::Transport(format!("{}: {e}", self.path.display())),
            })?;
            self.file = Some(file);
        }

        let result = match self.file.as_mut() {
            Some(file) => file.read_exact(buf).map_err(ReadError::from),
            None => Err(ReadError::NotFound),
        };
        if result.is_err() {
            self.file = None;
        }
        result
    }
}

/// Vacuum sensor backed by an ABP transducer.
///
/// Pressure is sign-inverted so that a working fan reads as positive vacuum.
pub struct AbpSensor<B: FrameBus> {
    part: AbpPart,
    bus: B,
}

impl<B: FrameBus> AbpSensor<B> {
    pub fn new(part: AbpPart, bus: B) -> Self {
        Self { part, bus }
    }

    pub fn part(&self) -> &AbpPart {
        &self.part
    }
}

impl<B: FrameBus> SampleSource for AbpSensor<B> {
    fn read(&mut self) -> Result<Sample, ReadError> {
        let mut buf = [0u8; 4];
        self.bus.read_frame(&mut buf)?;
        let frame = self.part.decode(&buf)?;

        Ok(Sample {
            value: self.part.to_inches_wc(-frame.pressure),
            timestamp: Local::now(),
            status: Some(frame.status),
            temperature_c: frame.temperature_c,
        })
    }
}

/// Celsius to Fahrenheit.
pub fn c_to_f(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}
