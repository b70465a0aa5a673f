//! Severity brackets with per-channel hysteresis and throttling.
//!
//! Each environmental channel classifies its value into an ordered list of
//! brackets, most severe first. A non-nominal bracket may notify at most once
//! per throttle period. The nominal bracket notifies once on the edge into
//! it, and is re-armed whenever a non-nominal bracket notifies.

use crate::core::channel::{AlertEvent, Channel};
use crate::sensors::types::EnvReading;
use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default per-channel throttle: once a day.
pub const DEFAULT_CHANNEL_THROTTLE_SECS: u64 = 24 * 60 * 60;

/// A severity band: values at or above `threshold` belong here unless a
/// more severe band matched first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub threshold: f64,
    pub label: String,
}

impl Bracket {
    pub fn new(threshold: f64, label: impl Into<String>) -> Self {
        Self {
            threshold,
            label: label.into(),
        }
    }
}

/// Problems with an authored bracket table.
#[derive(Debug, Clone, PartialEq)]
pub enum BracketError {
    Empty,
    NonFinite { index: usize },
    NotDescending { index: usize },
    NominalOutOfRange { nominal: usize, len: usize },
}

impl std::fmt::Display for BracketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BracketError::Empty => write!(f, "bracket table is empty"),
            BracketError::NonFinite { index } => {
                write!(f, "bracket {index} has a non-finite threshold")
            }
            BracketError::NotDescending { index } => {
                write!(f, "bracket {index} is not below the bracket before it")
            }
            BracketError::NominalOutOfRange { nominal, len } => {
                write!(f, "nominal index {nominal} outside table of {len} brackets")
            }
        }
    }
}

impl std::error::Error for BracketError {}

/// Ordered brackets plus the index of the nominal (no-alert) band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketTable {
    pub brackets: Vec<Bracket>,
    pub nominal_index: usize,
}

impl BracketTable {
    /// Build a table, checking that thresholds strictly descend.
    pub fn new(brackets: Vec<Bracket>, nominal_index: usize) -> Result<Self, BracketError> {
        let table = Self {
            brackets,
            nominal_index,
        };
        table.validate()?;
        Ok(table)
    }

    /// Build a table whose last bracket is nominal.
    pub fn with_last_nominal(brackets: Vec<Bracket>) -> Result<Self, BracketError> {
        let nominal = brackets.len().saturating_sub(1);
        Self::new(brackets, nominal)
    }

    pub fn validate(&self) -> Result<(), BracketError> {
        if self.brackets.is_empty() {
            return Err(BracketError::Empty);
        }
        for (index, bracket) in self.brackets.iter().enumerate() {
            if !bracket.threshold.is_finite() {
                return Err(BracketError::NonFinite { index });
            }
            if index > 0 && bracket.threshold >= self.brackets[index - 1].threshold {
                return Err(BracketError::NotDescending { index });
            }
        }
        if self.nominal_index >= self.brackets.len() {
            return Err(BracketError::NominalOutOfRange {
                nominal: self.nominal_index,
                len: self.brackets.len(),
            });
        }
        Ok(())
    }

    /// Index of the first bracket whose threshold `value` meets.
    ///
    /// The last bracket catches everything below it, so the lookup is total.
    pub fn lookup(&self, value: f64) -> usize {
        self.brackets
            .iter()
            .position(|b| value >= b.threshold)
            .unwrap_or_else(|| self.brackets.len().saturating_sub(1))
    }

    pub fn label(&self, index: usize) -> &str {
        self.brackets
            .get(index)
            .map(|b| b.label.as_str())
            .unwrap_or("")
    }
}

/// Relative humidity bands: Red, Yellow, Good.
pub const HUMIDITY_LABELS: [&str; 3] = ["Red", "Yellow", "Good"];

/// Classify relative humidity (percent) into the three humidity bands.
pub fn classify_humidity(percent: f64) -> usize {
    if percent > 70.0 || percent < 25.0 {
        0
    } else if percent > 60.0 || percent < 30.0 {
        1
    } else {
        2
    }
}

/// How a channel maps values to bracket indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Classifier {
    Table(BracketTable),
    /// Two-sided humidity bands; `Good` is nominal
    Humidity,
}

impl Classifier {
    pub fn classify(&self, value: f64) -> usize {
        match self {
            Classifier::Table(table) => table.lookup(value),
            Classifier::Humidity => classify_humidity(value),
        }
    }

    pub fn label(&self, index: usize) -> &str {
        match self {
            Classifier::Table(table) => table.label(index),
            Classifier::Humidity => HUMIDITY_LABELS.get(index).copied().unwrap_or(""),
        }
    }

    pub fn nominal_index(&self) -> usize {
        match self {
            Classifier::Table(table) => table.nominal_index,
            Classifier::Humidity => HUMIDITY_LABELS.len() - 1,
        }
    }
}

/// Hysteresis and throttle state for one channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelAlertState {
    last_bracket: Option<usize>,
    last_alert: HashMap<usize, DateTime<Local>>,
}

impl ChannelAlertState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bracket seen on the most recent evaluation.
    pub fn last_bracket(&self) -> Option<usize> {
        self.last_bracket
    }

    /// When `bracket` last notified, if it is armed as notified.
    pub fn last_alert_at(&self, bracket: usize) -> Option<DateTime<Local>> {
        self.last_alert.get(&bracket).copied()
    }

    /// Record an evaluation landing in `index` and decide whether it notifies.
    pub fn should_fire(
        &mut self,
        index: usize,
        nominal: usize,
        now: DateTime<Local>,
        throttle: Duration,
    ) -> bool {
        self.last_bracket = Some(index);

        if index == nominal {
            if self.last_alert.contains_key(&nominal) {
                return false;
            }
            self.last_alert.insert(nominal, now);
            return true;
        }

        let due = match self.last_alert.get(&index) {
            // Past the representable range means never due again.
            Some(last) => last
                .checked_add_signed(throttle)
                .is_some_and(|next| now > next),
            None => true,
        };
        if due {
            self.last_alert.insert(index, now);
            self.last_alert.remove(&nominal);
        }
        due
    }
}

/// Outcome of evaluating one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelOutcome {
    pub index: usize,
    pub severity: String,
    pub fired: bool,
}

/// Classify `value` and apply the channel's hysteresis and throttle.
pub fn evaluate_channel(
    classifier: &Classifier,
    value: f64,
    state: &mut ChannelAlertState,
    now: DateTime<Local>,
    throttle: Duration,
) -> ChannelOutcome {
    let index = classifier.classify(value);
    let fired = state.should_fire(index, classifier.nominal_index(), now, throttle);
    ChannelOutcome {
        index,
        severity: classifier.label(index).to_string(),
        fired,
    }
}

/// A channel wired into the evaluator.
#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    pub channel: Channel,
    pub classifier: Classifier,
    pub enabled: bool,
    state: ChannelAlertState,
}

impl ChannelMonitor {
    pub fn new(channel: Channel, classifier: Classifier, enabled: bool) -> Self {
        Self {
            channel,
            classifier,
            enabled,
            state: ChannelAlertState::new(),
        }
    }

    pub fn state(&self) -> &ChannelAlertState {
        &self.state
    }
}

/// Result of one pass over all environmental channels.
#[derive(Debug, Clone, Default)]
pub struct BracketEvaluation {
    /// One `"<Label>: <severity>"` line per enabled channel
    pub status_text: String,
    /// Whether any channel notified
    pub fired: bool,
    pub events: Vec<AlertEvent>,
}

/// Runs every enabled channel through its classifier and alert state.
#[derive(Debug, Clone)]
pub struct BracketAlertEvaluator {
    channels: Vec<ChannelMonitor>,
    throttle: Duration,
}

impl BracketAlertEvaluator {
    pub fn new(throttle: Duration) -> Self {
        Self {
            channels: Vec::new(),
            throttle,
        }
    }

    /// Add a channel; channels are evaluated in insertion order.
    pub fn with_channel(mut self, channel: Channel, classifier: Classifier, enabled: bool) -> Self {
        self.channels
            .push(ChannelMonitor::new(channel, classifier, enabled));
        self
    }

    pub fn channels(&self) -> &[ChannelMonitor] {
        &self.channels
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelMonitor> {
        self.channels.iter().find(|m| m.channel == channel)
    }

    pub fn evaluate(&mut self, reading: &EnvReading, now: DateTime<Local>) -> BracketEvaluation {
        let mut result = BracketEvaluation::default();

        for monitor in self.channels.iter_mut().filter(|m| m.enabled) {
            let value = monitor.channel.value_in(reading);
            let outcome = evaluate_channel(
                &monitor.classifier,
                value,
                &mut monitor.state,
                now,
                self.throttle,
            );
            let line = format!("{}: {}", monitor.channel.label(), outcome.severity);
            result.status_text.push_str(&line);
            result.status_text.push('\n');

            if outcome.fired {
                result.fired = true;
                result.events.push(AlertEvent {
                    channel: monitor.channel,
                    severity: outcome.severity,
                    message: line,
                    timestamp: now,
                });
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::types::EnvUnits;
    use chrono::TimeZone;

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 12, 0, 30).unwrap()
    }

    fn day() -> Duration {
        Duration::seconds(DEFAULT_CHANNEL_THROTTLE_SECS as i64)
    }

    fn radon() -> Classifier {
        Classifier::Table(
            BracketTable::with_last_nominal(vec![
                Bracket::new(4.0, "Red"),
                Bracket::new(2.7, "Yellow"),
                Bracket::new(0.0, "Green"),
            ])
            .unwrap(),
        )
    }

    fn temperature() -> Classifier {
        Classifier::Table(
            BracketTable::new(
                vec![
                    Bracket::new(77.0, "Red"),
                    Bracket::new(64.0, "Green"),
                    Bracket::new(-99.9, "Blue"),
                ],
                1,
            )
            .unwrap(),
        )
    }

    fn reading(radon: f64, humidity: f64) -> EnvReading {
        EnvReading {
            timestamp: t0(),
            radon_short_term: radon,
            radon_long_term: radon,
            voc: 50.0,
            co2: 500.0,
            temperature: 68.0,
            humidity,
            pressure: 1013.0,
            units: EnvUnits::default(),
        }
    }

    #[test]
    fn test_lookup() {
        let Classifier::Table(table) = radon() else {
            unreachable!()
        };
        assert_eq!(table.lookup(5.0), 0);
        assert_eq!(table.lookup(4.0), 0);
        assert_eq!(table.lookup(3.0), 1);
        assert_eq!(table.label(1), "Yellow");
        assert_eq!(table.lookup(0.5), 2);
        // Below the last threshold still lands in the last bracket.
        assert_eq!(table.lookup(-3.0), 2);
    }

    #[test]
    fn test_table_validation() {
        assert_eq!(BracketTable::new(vec![], 0), Err(BracketError::Empty));
        assert_eq!(
            BracketTable::new(vec![Bracket::new(1.0, "a"), Bracket::new(1.0, "b")], 1),
            Err(BracketError::NotDescending { index: 1 })
        );
        assert_eq!(
            BracketTable::new(vec![Bracket::new(1.0, "a")], 1),
            Err(BracketError::NominalOutOfRange { nominal: 1, len: 1 })
        );
        assert_eq!(
            BracketTable::new(vec![Bracket::new(f64::NAN, "a")], 0),
            Err(BracketError::NonFinite { index: 0 })
        );
    }

    #[test]
    fn test_humidity_bands() {
        assert_eq!(classify_humidity(72.0), 0);
        assert_eq!(classify_humidity(20.0), 0);
        assert_eq!(classify_humidity(65.0), 1);
        assert_eq!(classify_humidity(27.0), 1);
        assert_eq!(classify_humidity(50.0), 2);
        assert_eq!(classify_humidity(70.0), 1);
        assert_eq!(classify_humidity(30.0), 2);
    }

    #[test]
    fn test_radon_yellow_throttled_for_a_day() {
        let classifier = radon();
        let mut state = ChannelAlertState::new();

        let first = evaluate_channel(&classifier, 3.0, &mut state, t0(), day());
        assert_eq!(first.index, 1);
        assert_eq!(first.severity, "Yellow");
        assert!(first.fired);

        let repeat = evaluate_channel(&classifier, 3.0, &mut state, t0() + Duration::seconds(1), day());
        assert!(!repeat.fired);

        let at_boundary =
            evaluate_channel(&classifier, 3.0, &mut state, t0() + Duration::seconds(86_400), day());
        assert!(!at_boundary.fired);

        let next_day =
            evaluate_channel(&classifier, 3.0, &mut state, t0() + Duration::seconds(86_401), day());
        assert!(next_day.fired);
    }

    #[test]
    fn test_huge_throttle_never_refires() {
        let classifier = radon();
        let mut state = ChannelAlertState::new();
        let forever = Duration::seconds(1_000_000_000_000_000);

        assert!(evaluate_channel(&classifier, 3.0, &mut state, t0(), forever).fired);
        let later = t0() + Duration::days(3650);
        assert!(!evaluate_channel(&classifier, 3.0, &mut state, later, forever).fired);
    }

    #[test]
    fn test_nominal_edge_fires_once() {
        let classifier = radon();
        let mut state = ChannelAlertState::new();

        // Nothing has notified yet, so the first nominal reading announces itself.
        assert!(evaluate_channel(&classifier, 1.0, &mut state, t0(), day()).fired);
        for s in 1..10 {
            let now = t0() + Duration::seconds(s * 900);
            assert!(!evaluate_channel(&classifier, 1.0, &mut state, now, day()).fired);
        }
        assert_eq!(state.last_bracket(), Some(2));
    }

    #[test]
    fn test_non_nominal_alert_rearms_nominal_edge() {
        let classifier = radon();
        let mut state = ChannelAlertState::new();

        assert!(evaluate_channel(&classifier, 4.5, &mut state, t0(), day()).fired);
        assert!(state.last_alert_at(2).is_none());

        let back = t0() + Duration::seconds(900);
        assert!(evaluate_channel(&classifier, 1.0, &mut state, back, day()).fired);
        assert_eq!(state.last_alert_at(2), Some(back));
    }

    #[test]
    fn test_throttled_excursion_does_not_rearm() {
        let classifier = radon();
        let mut state = ChannelAlertState::new();

        assert!(evaluate_channel(&classifier, 3.0, &mut state, t0(), day()).fired);
        assert!(evaluate_channel(&classifier, 1.0, &mut state, t0() + Duration::hours(1), day()).fired);
        // Same bracket again within the day: silent, and the nominal edge stays disarmed.
        assert!(!evaluate_channel(&classifier, 3.0, &mut state, t0() + Duration::hours(2), day()).fired);
        assert!(!evaluate_channel(&classifier, 1.0, &mut state, t0() + Duration::hours(3), day()).fired);
    }

    #[test]
    fn test_temperature_nominal_is_middle_bracket() {
        let classifier = temperature();
        let mut state = ChannelAlertState::new();

        assert!(evaluate_channel(&classifier, 80.0, &mut state, t0(), day()).fired);
        let green = evaluate_channel(&classifier, 70.0, &mut state, t0() + Duration::hours(1), day());
        assert_eq!(green.severity, "Green");
        assert!(green.fired);
        assert!(!evaluate_channel(&classifier, 70.0, &mut state, t0() + Duration::hours(2), day()).fired);

        let blue = evaluate_channel(&classifier, 50.0, &mut state, t0() + Duration::hours(3), day());
        assert_eq!(blue.severity, "Blue");
        assert!(blue.fired);
        assert!(evaluate_channel(&classifier, 70.0, &mut state, t0() + Duration::hours(4), day()).fired);
    }

    #[test]
    fn test_humidity_red_good_transitions() {
        let classifier = Classifier::Humidity;
        let mut state = ChannelAlertState::new();
        let at = |h: i64| t0() + Duration::hours(h);

        let red = evaluate_channel(&classifier, 72.0, &mut state, at(0), day());
        assert_eq!(red.severity, "Red");
        assert!(red.fired);

        let good = evaluate_channel(&classifier, 50.0, &mut state, at(1), day());
        assert_eq!(good.severity, "Good");
        assert!(good.fired);
        assert!(!evaluate_channel(&classifier, 50.0, &mut state, at(2), day()).fired);

        // After the red throttle has expired the cycle repeats.
        assert!(evaluate_channel(&classifier, 72.0, &mut state, at(30), day()).fired);
        assert!(evaluate_channel(&classifier, 50.0, &mut state, at(31), day()).fired);
        assert!(!evaluate_channel(&classifier, 50.0, &mut state, at(32), day()).fired);
    }

    #[test]
    fn test_evaluator_status_text_and_events() {
        let mut evaluator = BracketAlertEvaluator::new(day())
            .with_channel(Channel::Radon, radon(), true)
            .with_channel(Channel::Humidity, Classifier::Humidity, true)
            .with_channel(Channel::Temperature, temperature(), false);

        let result = evaluator.evaluate(&reading(3.0, 50.0), t0());
        assert_eq!(result.status_text, "Radon: Yellow\nRH   : Good\n");
        assert!(result.fired);
        assert_eq!(result.events.len(), 2);
        assert_eq!(result.events[0].channel, Channel::Radon);
        assert_eq!(result.events[0].message, "Radon: Yellow");

        let again = evaluator.evaluate(&reading(3.0, 50.0), t0() + Duration::minutes(15));
        assert_eq!(again.status_text, result.status_text);
        assert!(!again.fired);
        assert!(again.events.is_empty());

        let radon_state = evaluator.channel(Channel::Radon).unwrap().state();
        assert_eq!(radon_state.last_bracket(), Some(1));
        assert!(evaluator.channel(Channel::Temperature).unwrap().state().last_bracket().is_none());
    }
}
