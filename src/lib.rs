//! Radon Monitor - sub-slab depressurization vacuum and indoor air monitor.
//!
//! This library samples a differential pressure transducer on the radon
//! mitigation pipe, averages it per minute, learns the normal vacuum level
//! and alerts when the fan stops keeping up. An optional indoor air device
//! (radon, VOC, CO2, temperature, humidity) is read every quarter hour and
//! classified into severity brackets.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Radon Monitor                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Scheduler  │──▶│  Averager   │──▶│ Calibration │       │
//! │  │ (aligned s) │   │ (per minute)│   │  + Delta    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │  Brackets   │────────────────────▶│ CSV log and │       │
//! │  │ (env, 15m)  │                     │ notifier    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use radon_monitor::{
//!     Config, ConsoleNotifier, CsvLog, Monitor, Scheduler, SimulatedEnv, SimulatedPressure,
//! };
//!
//! let mut config = Config::default();
//! config.environment.enabled = true;
//! let log = CsvLog::new(&config.data_path, config.missing_sentinel);
//! let mut monitor = Monitor::new(
//!     &config,
//!     SimulatedPressure::default(),
//!     Some(SimulatedEnv::new()),
//!     log,
//!     ConsoleNotifier::new(),
//! )
//! .expect("invalid configuration");
//!
//! let scheduler = Scheduler::new(config.sampling.interval_secs);
//! scheduler.run(|now| {
//!     monitor.tick(now);
//! });
//! ```

pub mod config;
pub mod core;
pub mod monitor;
pub mod scheduler;
pub mod sensors;
pub mod sinks;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, DaySelector};
pub use core::{
    Averager, BaselineCalibrator, BracketAlertEvaluator, BracketTable, CalibrationStatus,
    Channel, DeltaAlertEvaluator, DeltaClass,
};
pub use monitor::{AlertThrottle, Dispatch, EnvOutcome, FlushOutcome, Monitor, StatusGate, TickReport};
pub use scheduler::{next_fire_time, Scheduler, StopHandle};
pub use sensors::{
    AbpPart, AbpSensor, DeviceFileBus, EnvReading, EnvSource, ReadError, Sample, SampleSource,
    SimulatedEnv, SimulatedPressure,
};
pub use sinks::{
    ConsoleNotifier, CsvLog, LogSink, MemoryLog, NotificationSink, RecordingNotifier, SendError,
};
pub use stats::{RunStats, SharedStats};

// Webhook re-exports (when enabled)
#[cfg(feature = "webhook")]
pub use sinks::{BlockingWebhookNotifier, WebhookConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
