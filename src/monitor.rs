//! The monitoring engine.
//!
//! [`Monitor::tick`] runs one scheduler cycle: read and accumulate a
//! pressure sample, flush and evaluate the window on a minute boundary, read
//! the environmental device on its sub-interval, and send the status report
//! at its time of day. Collaborator failures degrade the cycle and are
//! logged; they never abort it.

use crate::config::{Config, ConfigError, DaySelector, StatusConfig};
use crate::core::{
    Averager, BaselineCalibrator, BracketAlertEvaluator, BracketEvaluation, CalibrationStatus,
    Channel, Classifier, DeltaAlertEvaluator, DeltaClass, DeltaLimits,
};
use crate::sensors::abp::c_to_f;
use crate::sensors::{EnvReading, EnvSource, EnvUnits, ReadError, SampleSource};
use crate::sinks::{
    LogSink, NotificationSink, Record, ALERT_TOPIC, ENV_TOPIC, PRESSURE_TOPIC, STATUS_TOPIC,
};
use crate::stats::{create_shared_stats, SharedStats};
use chrono::{DateTime, Datelike, Duration, Local, Timelike};

/// CSV header for the pressure log.
pub const PRESSURE_HEADER: &str = "Inches w.c.";

/// Attempts per cycle before an environmental read is given up.
pub const ENV_READ_ATTEMPTS: u32 = 3;

const LOCAL_TIME_FORMAT: &str = "%a, %Y-%b-%d, %H:%M:%S";
const REPORT_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the transport successfully
    Sent,
    /// The transport failed; the alert still counts as attempted
    Failed,
    /// Held back by the global alert throttle
    Throttled,
    /// Alerts of this kind are disabled; logged only
    Suppressed,
}

/// Outcome of a window flush.
#[derive(Debug, Clone, PartialEq)]
pub struct FlushOutcome {
    pub average: f64,
    /// Set while the baseline is still being established
    pub calibration: Option<CalibrationStatus>,
    /// Set once the baseline is frozen
    pub classification: Option<DeltaClass>,
    pub alert: Option<Dispatch>,
}

/// Outcome of an environmental read.
#[derive(Debug, Clone)]
pub enum EnvOutcome {
    Read {
        evaluation: BracketEvaluation,
        alert: Option<Dispatch>,
    },
    Failed(ReadError),
}

/// Everything one tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Accumulated sample value, `None` if the sample was absent
    pub sample: Option<f64>,
    pub flush: Option<FlushOutcome>,
    pub env: Option<EnvOutcome>,
    pub status: Option<Dispatch>,
}

/// Minimum spacing between outbound pressure alerts.
#[derive(Debug, Clone)]
pub struct AlertThrottle {
    min_interval: Duration,
    last_sent: Option<DateTime<Local>>,
}

impl AlertThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    /// Claim the send slot at `now`, if the interval has elapsed.
    pub fn try_acquire(&mut self, now: DateTime<Local>) -> bool {
        let open = match self.last_sent {
            Some(last) => now - last > self.min_interval,
            None => true,
        };
        if open {
            self.last_sent = Some(now);
        }
        open
    }

    pub fn last_sent(&self) -> Option<DateTime<Local>> {
        self.last_sent
    }
}

/// Decides whether a status report is due.
#[derive(Debug, Clone)]
pub struct StatusGate {
    hour: u32,
    minute: u32,
    selector: DaySelector,
    countdown: u32,
}

impl StatusGate {
    pub fn new(config: &StatusConfig) -> Self {
        Self {
            hour: config.hour,
            minute: config.minute,
            selector: config.selector(),
            countdown: 0,
        }
    }

    /// Check `now` against the schedule. Day-interval countdowns advance on
    /// each call at the report time, so call once per report-time tick.
    pub fn due(&mut self, now: DateTime<Local>) -> bool {
        if now.hour() != self.hour || now.minute() != self.minute || now.second() != 0 {
            return false;
        }

        match self.selector {
            DaySelector::EveryNDays(n) => {
                self.countdown = self.countdown.saturating_sub(1);
                if self.countdown == 0 {
                    self.countdown = n;
                    true
                } else {
                    false
                }
            }
            DaySelector::DayOfMonth(day) => now.day() == day,
            DaySelector::DayOfWeek(weekday) => now.weekday() == weekday,
        }
    }
}

#[derive(Debug, Clone)]
struct Settings {
    pressure_alerts: bool,
    env_alerts: bool,
    env_every_minutes: u32,
    env_at_second: u32,
    status_enabled: bool,
}

/// The sampling, averaging, calibration and alerting engine.
pub struct Monitor<P, E, L, N> {
    source: P,
    env_source: Option<E>,
    log: L,
    notifier: N,
    averager: Averager,
    calibrator: BaselineCalibrator,
    delta: DeltaAlertEvaluator,
    brackets: BracketAlertEvaluator,
    throttle: AlertThrottle,
    status_gate: StatusGate,
    settings: Settings,
    env_header: String,
    last_env_slot: Option<DateTime<Local>>,
    last_pressure_line: String,
    last_env_message: String,
    stats: SharedStats,
}

impl<P, E, L, N> Monitor<P, E, L, N>
where
    P: SampleSource,
    E: EnvSource,
    L: LogSink,
    N: NotificationSink,
{
    /// Validate `config` and build a monitor around the given collaborators.
    ///
    /// The environmental step runs only when `env_source` is provided and
    /// `environment.enabled` is set; otherwise the source is dropped.
    pub fn new(
        config: &Config,
        source: P,
        env_source: Option<E>,
        log: L,
        notifier: N,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let global = to_chrono(
            config.notify.min_interval_between_alerts,
            "notify.min_interval_between_alerts",
        )?;
        let channel = to_chrono(config.notify.channel_throttle, "notify.channel_throttle")?;

        let env = &config.environment;
        let brackets = BracketAlertEvaluator::new(channel)
            .with_channel(
                Channel::Radon,
                Classifier::Table(env.radon.brackets.clone()),
                env.radon.enabled,
            )
            .with_channel(
                Channel::Voc,
                Classifier::Table(env.voc.brackets.clone()),
                env.voc.enabled,
            )
            .with_channel(
                Channel::Co2,
                Classifier::Table(env.co2.brackets.clone()),
                env.co2.enabled,
            )
            .with_channel(
                Channel::Temperature,
                Classifier::Table(env.temperature.brackets.clone()),
                env.temperature.enabled,
            )
            .with_channel(Channel::Humidity, Classifier::Humidity, env.humidity_enabled);

        let env_source = if env.enabled {
            env_source
        } else {
            if env_source.is_some() {
                tracing::info!("Environmental device disabled in configuration; not reading it");
            }
            None
        };

        let p = &config.pressure;
        Ok(Self {
            source,
            env_source,
            log,
            notifier,
            averager: Averager::new(
                config.sampling.window_samples,
                config.sampling.partial_window_fraction,
            ),
            calibrator: BaselineCalibrator::new(config.sampling.calibration_count),
            delta: DeltaAlertEvaluator::new(DeltaLimits {
                delta_low: p.delta_low,
                delta_high: p.delta_high,
                floor: p.floor,
                ceiling: p.ceiling,
            }),
            brackets,
            throttle: AlertThrottle::new(global),
            status_gate: StatusGate::new(&config.status),
            settings: Settings {
                pressure_alerts: p.alerts_enabled,
                env_alerts: env.alerts_enabled,
                env_every_minutes: env.read_every_minutes,
                env_at_second: env.read_at_second,
                status_enabled: config.status.enabled,
            },
            env_header: EnvReading::header(&EnvUnits::default()),
            last_env_slot: None,
            last_pressure_line: String::new(),
            last_env_message: String::new(),
            stats: create_shared_stats(),
        })
    }

    /// Record counters into `stats` instead of a private instance.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    /// Take one reading and send the "Program start" status message.
    pub fn announce_start(&mut self, now: DateTime<Local>) -> Option<Dispatch> {
        let reading = match self.source.read() {
            Ok(sample) => {
                let status = sample.status.map(|s| s.code()).unwrap_or(0);
                let mut line = format!("Status: {status}  Vacuum: {:7.2} in.wc", sample.value);
                if let Some(temp) = sample.temperature_c {
                    line.push_str(&format!(" {:5.1} degF", c_to_f(temp)));
                }
                line
            }
            Err(e) => format!("Sensor read failed: {e}"),
        };
        tracing::info!("{reading}");

        if !self.settings.status_enabled {
            return None;
        }
        let message = format!(
            "Program start at {}\n{reading}\n",
            now.format(REPORT_TIME_FORMAT)
        );
        Some(self.dispatch(STATUS_TOPIC, &message))
    }

    /// Run one scheduler cycle at wall-clock time `now`.
    pub fn tick(&mut self, now: DateTime<Local>) -> TickReport {
        let mut report = TickReport {
            sample: self.sample(),
            ..TickReport::default()
        };

        if self.averager.should_flush(now) {
            report.flush = self.flush_window(now);
        }

        if self.env_due(now) {
            report.env = self.read_environment(now);
        }

        if self.settings.status_enabled && self.status_gate.due(now) {
            report.status = Some(self.send_status(now));
        }

        report
    }

    fn sample(&mut self) -> Option<f64> {
        match self.source.read() {
            Ok(sample) if sample.is_valid() => {
                self.averager.accumulate(&sample);
                self.stats.record_sample();
                Some(sample.value)
            }
            Ok(sample) => {
                tracing::debug!(status = ?sample.status, "Skipping sample with non-normal status");
                self.stats.record_absent_sample();
                None
            }
            Err(e) => {
                tracing::warn!("Pressure read failed: {e}");
                self.stats.record_absent_sample();
                None
            }
        }
    }

    fn flush_window(&mut self, now: DateTime<Local>) -> Option<FlushOutcome> {
        let average = match self.averager.flush() {
            Ok(avg) => avg,
            Err(e) => {
                tracing::debug!("Skipping flush: {e}");
                return None;
            }
        };
        self.stats.record_window_flushed();

        if let Err(e) = self
            .log
            .append(PRESSURE_TOPIC, now, &Record::Scalar(Some(average)), PRESSURE_HEADER)
        {
            tracing::warn!("Failed to log pressure average: {e}");
            self.stats.record_log_failure();
        }

        self.last_pressure_line = format!(
            "{} Vacuum: {:7.2} in.wc",
            now.format(LOCAL_TIME_FORMAT),
            average
        );

        let mut outcome = FlushOutcome {
            average,
            calibration: None,
            classification: None,
            alert: None,
        };

        let baseline = match self.calibrator.baseline() {
            Some(baseline) => baseline,
            None => {
                let status = self.calibrator.observe(average);
                tracing::info!("{} {}", self.last_pressure_line, status.describe());
                outcome.calibration = Some(status);
                return Some(outcome);
            }
        };

        let class = self.delta.evaluate(average, baseline);
        tracing::info!("{} {}", self.last_pressure_line, class.describe());
        outcome.classification = Some(class);

        if class.is_alert() {
            self.stats.record_alert();
            let message = format!("Alert {} {}", self.last_pressure_line, class.describe());
            outcome.alert = Some(if !self.settings.pressure_alerts {
                tracing::warn!("{message}");
                Dispatch::Suppressed
            } else if self.throttle.try_acquire(now) {
                self.dispatch(ALERT_TOPIC, &message)
            } else {
                tracing::debug!("Pressure alert throttled");
                self.stats.record_throttled();
                Dispatch::Throttled
            });
        }

        Some(outcome)
    }

    /// Whether the environmental read for the current slot is due.
    ///
    /// A slot is a minute that is a multiple of the read interval; the read
    /// happens on the first tick at or after the configured second.
    fn env_due(&mut self, now: DateTime<Local>) -> bool {
        if self.env_source.is_none()
            || now.minute() % self.settings.env_every_minutes != 0
            || now.second() < self.settings.env_at_second
        {
            return false;
        }

        let slot = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        if self.last_env_slot == Some(slot) {
            return false;
        }
        self.last_env_slot = Some(slot);
        true
    }

    fn read_environment(&mut self, now: DateTime<Local>) -> Option<EnvOutcome> {
        let source = self.env_source.as_mut()?;

        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            match source.read() {
                Ok(reading) => break Ok(reading),
                Err(e) => {
                    tracing::warn!(attempt, "Environmental read failed: {e}");
                    if attempt >= ENV_READ_ATTEMPTS {
                        break Err(e);
                    }
                }
            }
        };

        let reading = match result {
            Ok(reading) => reading,
            Err(e) => {
                let missing = Record::List(vec![None; 7]);
                if let Err(log_err) = self.log.append(ENV_TOPIC, now, &missing, &self.env_header) {
                    tracing::warn!("Failed to log environmental reading: {log_err}");
                    self.stats.record_log_failure();
                }
                return Some(EnvOutcome::Failed(e));
            }
        };
        self.stats.record_env_read();

        let record = Record::List(reading.values().iter().map(|v| Some(*v)).collect());
        let header = EnvReading::header(&reading.units);
        if let Err(e) = self.log.append(ENV_TOPIC, now, &record, &header) {
            tracing::warn!("Failed to log environmental reading: {e}");
            self.stats.record_log_failure();
        }

        let evaluation = self.brackets.evaluate(&reading, now);
        let message = format!(
            "{} {}\n{}",
            now.format(LOCAL_TIME_FORMAT),
            reading.describe(),
            evaluation.status_text
        );
        self.last_env_message = message.clone();

        let alert = if evaluation.fired {
            for event in &evaluation.events {
                tracing::info!(channel = %event.channel, severity = %event.severity, "Bracket alert");
                self.stats.record_alert();
            }
            if self.settings.env_alerts {
                Some(self.dispatch(ALERT_TOPIC, &message))
            } else {
                tracing::warn!("{message}");
                Some(Dispatch::Suppressed)
            }
        } else {
            tracing::info!("{message}");
            None
        };

        Some(EnvOutcome::Read { evaluation, alert })
    }

    fn send_status(&mut self, now: DateTime<Local>) -> Dispatch {
        let message = format!(
            "Reporting at {}\n{}\n{}",
            now.format(REPORT_TIME_FORMAT),
            self.last_pressure_line,
            self.last_env_message
        );
        self.dispatch(STATUS_TOPIC, &message)
    }

    fn dispatch(&mut self, topic: &str, message: &str) -> Dispatch {
        match self.notifier.send(topic, message) {
            Ok(()) => {
                self.stats.record_notification();
                Dispatch::Sent
            }
            Err(e) => {
                tracing::warn!(topic, "Notification failed: {e}");
                self.stats.record_send_failure();
                Dispatch::Failed
            }
        }
    }

    pub fn calibrator(&self) -> &BaselineCalibrator {
        &self.calibrator
    }

    pub fn averager(&self) -> &Averager {
        &self.averager
    }

    pub fn brackets(&self) -> &BracketAlertEvaluator {
        &self.brackets
    }

    pub fn throttle(&self) -> &AlertThrottle {
        &self.throttle
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Whether the environmental step is active.
    pub fn has_env_source(&self) -> bool {
        self.env_source.is_some()
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// Last pressure line, as included in status reports.
    pub fn last_pressure_line(&self) -> &str {
        &self.last_pressure_line
    }
}

fn to_chrono(d: std::time::Duration, field: &'static str) -> Result<Duration, ConfigError> {
    Duration::from_std(d).map_err(|e| ConfigError::Invalid {
        field,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, day, h, m, s).unwrap()
    }

    #[test]
    fn test_throttle_spacing() {
        let mut throttle = AlertThrottle::new(Duration::seconds(3600));
        assert!(throttle.try_acquire(at(15, 10, 0, 0)));
        assert!(!throttle.try_acquire(at(15, 10, 30, 0)));
        assert!(!throttle.try_acquire(at(15, 11, 0, 0)));
        assert!(throttle.try_acquire(at(15, 11, 0, 1)));
        assert_eq!(throttle.last_sent(), Some(at(15, 11, 0, 1)));
    }

    #[test]
    fn test_status_every_day_first_report_sent() {
        let mut gate = StatusGate::new(&StatusConfig::default());
        assert!(!gate.due(at(15, 12, 4, 0)));
        assert!(!gate.due(at(15, 12, 5, 1)));
        assert!(gate.due(at(15, 12, 5, 0)));
        assert!(gate.due(at(16, 12, 5, 0)));
    }

    #[test]
    fn test_status_every_other_day() {
        let mut gate = StatusGate::new(&StatusConfig {
            interval_days: 2,
            ..StatusConfig::default()
        });
        assert!(gate.due(at(15, 12, 5, 0)));
        assert!(!gate.due(at(16, 12, 5, 0)));
        assert!(gate.due(at(17, 12, 5, 0)));
    }

    #[test]
    fn test_status_day_of_month_and_week() {
        let mut by_month = StatusGate::new(&StatusConfig {
            interval_days: 0,
            day_of_month: 16,
            ..StatusConfig::default()
        });
        assert!(!by_month.due(at(15, 12, 5, 0)));
        assert!(by_month.due(at(16, 12, 5, 0)));

        // 2024-01-15 is a Monday
        let mut by_week = StatusGate::new(&StatusConfig {
            interval_days: 0,
            day_of_month: 0,
            day_of_week: 0,
            ..StatusConfig::default()
        });
        assert!(by_week.due(at(15, 12, 5, 0)));
        assert!(!by_week.due(at(16, 12, 5, 0)));
    }
}
