//! Configuration for the Radon Monitor.

use crate::core::{Bracket, BracketError, BracketTable, DEFAULT_CHANNEL_THROTTLE_SECS};
use crate::sensors::AbpPart;
use crate::sinks::DEFAULT_MISSING_SENTINEL;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Sampling intervals that divide a minute evenly.
pub const ALLOWED_INTERVALS: [u32; 10] = [1, 2, 3, 4, 5, 6, 10, 15, 20, 30];

/// Longest accepted per-channel throttle (one year).
pub const MAX_CHANNEL_THROTTLE_SECS: u64 = 365 * 86_400;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Pressure sampling and averaging
    pub sampling: SamplingConfig,

    /// Pressure transducer selection
    pub sensor: SensorConfig,

    /// Pressure alert limits
    pub pressure: PressureAlertConfig,

    /// Environmental device channels
    pub environment: EnvironmentConfig,

    /// Daily status report schedule
    pub status: StatusConfig,

    /// Notification throttles and transport
    pub notify: NotifyConfig,

    /// Path for CSV logs and run statistics
    pub data_path: PathBuf,

    /// Value written to logs in place of a missing reading
    pub missing_sentinel: f64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("radon-monitor");

        Self {
            sampling: SamplingConfig::default(),
            sensor: SensorConfig::default(),
            pressure: PressureAlertConfig::default(),
            environment: EnvironmentConfig::default(),
            status: StatusConfig::default(),
            notify: NotifyConfig::default(),
            data_path: data_dir,
            missing_sentinel: DEFAULT_MISSING_SENTINEL,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("radon-monitor")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Check every operator parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sampling;
        if !ALLOWED_INTERVALS.contains(&s.interval_secs) {
            return Err(invalid(
                "sampling.interval_secs",
                format!("{} is not one of {:?}", s.interval_secs, ALLOWED_INTERVALS),
            ));
        }
        if !(10..=300).contains(&s.window_samples) {
            return Err(invalid(
                "sampling.window_samples",
                "averaging should be in range of 10 - 300 measurements",
            ));
        }
        if !(s.partial_window_fraction > 0.0 && s.partial_window_fraction <= 1.0) {
            return Err(invalid(
                "sampling.partial_window_fraction",
                "should be greater than 0 and at most 1",
            ));
        }
        if s.calibration_count == 0 {
            return Err(invalid("sampling.calibration_count", "must be at least 1"));
        }

        AbpPart::parse(&self.sensor.part_code)
            .map_err(|e| invalid("sensor.part_code", e.to_string()))?;

        let p = &self.pressure;
        for (field, delta) in [("pressure.delta_low", p.delta_low), ("pressure.delta_high", p.delta_high)] {
            if !(0.1..=1.0).contains(&delta) {
                return Err(invalid(
                    field,
                    "vacuum delta should be in range of 0.1 - 1.0 inches of water column",
                ));
            }
        }
        if p.ceiling > 10.0 {
            return Err(invalid(
                "pressure.ceiling",
                "maximum vacuum should be less than 10.0 inches of water column",
            ));
        }
        if !(p.floor >= 0.1 && p.floor <= p.ceiling) {
            return Err(invalid(
                "pressure.floor",
                "minimum vacuum should be in range of 0.1 - ceiling inches of water column",
            ));
        }

        let env = &self.environment;
        if !(1..=60).contains(&env.read_every_minutes) {
            return Err(invalid("environment.read_every_minutes", "should be in range of 1 - 60"));
        }
        if env.read_at_second > 59 {
            return Err(invalid("environment.read_at_second", "should be in range of 0 - 59"));
        }
        // The last tick of a minute lands at 60 - interval.
        if env.read_at_second > 60 - s.interval_secs {
            return Err(invalid(
                "environment.read_at_second",
                format!(
                    "should be at most {} with a {} second sampling interval",
                    60 - s.interval_secs,
                    s.interval_secs
                ),
            ));
        }
        for (field, channel) in [
            ("environment.radon", &env.radon),
            ("environment.voc", &env.voc),
            ("environment.co2", &env.co2),
            ("environment.temperature", &env.temperature),
        ] {
            channel
                .brackets
                .validate()
                .map_err(|source| ConfigError::Brackets { field, source })?;
        }

        let st = &self.status;
        if st.hour > 23 {
            return Err(invalid("status.hour", "status message hour should be in the range of 0 - 23"));
        }
        if st.minute > 59 {
            return Err(invalid("status.minute", "status message minute should be in the range of 0 - 59"));
        }
        if st.interval_days > 180 {
            return Err(invalid(
                "status.interval_days",
                "status message interval should be in the range of 0 - 180 days",
            ));
        }
        if st.day_of_month > 31 {
            return Err(invalid(
                "status.day_of_month",
                "status message day of month should be in the range of 0 - 31",
            ));
        }
        if st.day_of_week > 6 {
            return Err(invalid(
                "status.day_of_week",
                "status message day of week should be in the range of 0 - 6 (Monday-Sunday)",
            ));
        }

        if self.notify.min_interval_between_alerts > Duration::from_secs(86_400) {
            return Err(invalid(
                "notify.min_interval_between_alerts",
                "should be at most 86400 seconds",
            ));
        }
        if self.notify.channel_throttle > Duration::from_secs(MAX_CHANNEL_THROTTLE_SECS) {
            return Err(invalid(
                "notify.channel_throttle",
                format!("should be at most {MAX_CHANNEL_THROTTLE_SECS} seconds"),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

/// Pressure sampling and averaging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Seconds between samples; must divide a minute evenly
    pub interval_secs: u32,
    /// Samples per averaging window
    pub window_samples: u32,
    /// Fraction of the window needed before it may flush
    pub partial_window_fraction: f64,
    /// Window averages folded into the baseline
    pub calibration_count: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            window_samples: 60,
            partial_window_fraction: 0.8,
            calibration_count: 30,
        }
    }
}

/// Pressure transducer selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Six-character part code, e.g. "060MG2"
    pub part_code: String,
    /// Character device frames are read from
    pub device_path: PathBuf,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            part_code: "060MG2".to_string(),
            device_path: PathBuf::from("/dev/spidev0.0"),
        }
    }
}

/// Pressure alert limits, in inches of water column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureAlertConfig {
    /// Send pressure alerts (otherwise they are only logged)
    pub alerts_enabled: bool,
    pub delta_low: f64,
    pub delta_high: f64,
    /// Absolute minimum vacuum
    pub floor: f64,
    /// Absolute maximum vacuum
    pub ceiling: f64,
}

impl Default for PressureAlertConfig {
    fn default() -> Self {
        Self {
            alerts_enabled: true,
            delta_low: 0.4,
            delta_high: 0.4,
            floor: 0.5,
            ceiling: 5.0,
        }
    }
}

/// One bracketed environmental channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub brackets: BracketTable,
}

impl ChannelConfig {
    fn last_nominal(brackets: Vec<Bracket>) -> Self {
        let nominal_index = brackets.len().saturating_sub(1);
        Self {
            enabled: true,
            brackets: BracketTable {
                brackets,
                nominal_index,
            },
        }
    }
}

/// Environmental device channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Whether an environmental device is attached
    pub enabled: bool,
    /// Send environmental alerts (otherwise they are only logged)
    pub alerts_enabled: bool,
    /// Read when the minute is a multiple of this
    pub read_every_minutes: u32,
    /// Second within the minute to read at
    pub read_at_second: u32,
    pub radon: ChannelConfig,
    pub voc: ChannelConfig,
    pub co2: ChannelConfig,
    pub temperature: ChannelConfig,
    pub humidity_enabled: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            alerts_enabled: true,
            read_every_minutes: 15,
            read_at_second: 30,
            radon: ChannelConfig::last_nominal(vec![
                Bracket::new(4.0, "Red"),
                Bracket::new(2.7, "Yellow"),
                Bracket::new(0.0, "Green"),
            ]),
            voc: ChannelConfig::last_nominal(vec![
                Bracket::new(2000.0, "Red"),
                Bracket::new(250.0, "Yellow"),
                Bracket::new(0.0, "Green"),
            ]),
            co2: ChannelConfig::last_nominal(vec![
                Bracket::new(2000.0, "Red"),
                Bracket::new(800.0, "Yellow"),
                Bracket::new(250.0, "Poor"),
                Bracket::new(0.0, "Good"),
            ]),
            temperature: ChannelConfig {
                enabled: true,
                brackets: BracketTable {
                    brackets: vec![
                        Bracket::new(77.0, "Red"),
                        Bracket::new(64.0, "Green"),
                        Bracket::new(-99.9, "Blue"),
                    ],
                    nominal_index: 1,
                },
            },
            humidity_enabled: true,
        }
    }
}

/// Status report schedule.
///
/// Exactly one day selector is active: a non-zero `interval_days` wins,
/// then a non-zero `day_of_month`, then `day_of_week`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
    /// Every n days (0 = use day of month or day of week)
    pub interval_days: u32,
    /// Day of month (0 = use day of week)
    pub day_of_month: u32,
    /// Day of week, 0 = Monday
    pub day_of_week: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 12,
            minute: 5,
            interval_days: 1,
            day_of_month: 0,
            day_of_week: 0,
        }
    }
}

/// The active day selector of a status schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySelector {
    EveryNDays(u32),
    DayOfMonth(u32),
    DayOfWeek(Weekday),
}

impl StatusConfig {
    pub fn selector(&self) -> DaySelector {
        if self.interval_days > 0 {
            DaySelector::EveryNDays(self.interval_days)
        } else if self.day_of_month > 0 {
            DaySelector::DayOfMonth(self.day_of_month)
        } else {
            let weekday = match self.day_of_week {
                0 => Weekday::Mon,
                1 => Weekday::Tue,
                2 => Weekday::Wed,
                3 => Weekday::Thu,
                4 => Weekday::Fri,
                5 => Weekday::Sat,
                _ => Weekday::Sun,
            };
            DaySelector::DayOfWeek(weekday)
        }
    }
}

/// Notification throttles and transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Minimum time between two pressure alert notifications
    #[serde(with = "duration_serde")]
    pub min_interval_between_alerts: Duration,

    /// Minimum time before the same environmental bracket notifies again
    #[serde(with = "duration_serde")]
    pub channel_throttle: Duration,

    /// Webhook URL (requires the webhook feature)
    pub webhook_url: Option<String>,

    /// Bearer token for the webhook
    pub webhook_token: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            min_interval_between_alerts: Duration::from_secs(3600),
            channel_throttle: Duration::from_secs(DEFAULT_CHANNEL_THROTTLE_SECS),
            webhook_url: None,
            webhook_token: None,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid { field: &'static str, message: String },
    Brackets { field: &'static str, source: BracketError },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid { field, message } => write!(f, "Error ({field}): {message}"),
            ConfigError::Brackets { field, source } => write!(f, "Error ({field}): {source}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
