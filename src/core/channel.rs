//! Monitored channels and the alert events they raise.

use crate::sensors::types::EnvReading;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A monitored quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Radon,
    Voc,
    Co2,
    Temperature,
    Humidity,
}

impl Channel {
    /// Environmental channels in evaluation order.
    pub const ENVIRONMENTAL: [Channel; 5] = [
        Channel::Radon,
        Channel::Voc,
        Channel::Co2,
        Channel::Temperature,
        Channel::Humidity,
    ];

    /// Fixed-width label used in status lines.
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Radon => "Radon",
            Channel::Voc => "VOC  ",
            Channel::Co2 => "CO2  ",
            Channel::Temperature => "Temp ",
            Channel::Humidity => "RH   ",
        }
    }

    /// The value of this channel in an environmental reading.
    ///
    /// Radon alerts use the short-term average.
    pub fn value_in(&self, reading: &EnvReading) -> f64 {
        match self {
            Channel::Radon => reading.radon_short_term,
            Channel::Voc => reading.voc,
            Channel::Co2 => reading.co2,
            Channel::Temperature => reading.temperature,
            Channel::Humidity => reading.humidity,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label().trim_end())
    }
}

/// An alert raised by an evaluator, before notification throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub channel: Channel,
    pub severity: String,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::types::EnvUnits;

    #[test]
    fn test_labels_are_fixed_width() {
        for channel in Channel::ENVIRONMENTAL {
            assert_eq!(channel.label().len(), 5);
        }
        assert_eq!(Channel::Voc.to_string(), "VOC");
    }

    #[test]
    fn test_value_in_reading() {
        let reading = EnvReading {
            timestamp: Local::now(),
            radon_short_term: 3.0,
            radon_long_term: 1.0,
            voc: 100.0,
            co2: 700.0,
            temperature: 70.0,
            humidity: 45.0,
            pressure: 1010.0,
            units: EnvUnits::default(),
        };
        assert_eq!(Channel::Radon.value_in(&reading), 3.0);
        assert_eq!(Channel::Humidity.value_in(&reading), 45.0);
    }
}
