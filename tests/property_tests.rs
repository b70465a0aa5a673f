//! Property tests for the averaging and bracket classification cores.

use chrono::{Duration, Local, TimeZone};
use proptest::prelude::*;
use radon_monitor::core::{
    evaluate_channel, Averager, BaselineCalibrator, Bracket, BracketTable, CalibrationStatus,
    ChannelAlertState, Classifier,
};
use radon_monitor::sensors::Sample;

/// Strictly descending thresholds built from positive gaps below a top value.
fn descending_table() -> impl Strategy<Value = BracketTable> {
    (
        -1000.0f64..1000.0,
        proptest::collection::vec(0.01f64..100.0, 1..8),
    )
        .prop_map(|(top, gaps)| {
            let mut threshold = top;
            let mut brackets = vec![Bracket::new(threshold, "b0")];
            for (i, gap) in gaps.iter().enumerate() {
                threshold -= gap;
                brackets.push(Bracket::new(threshold, format!("b{}", i + 1)));
            }
            BracketTable::with_last_nominal(brackets).unwrap()
        })
}

proptest! {
    /// Lookup always returns an index in range, and it is the first bracket
    /// whose threshold the value meets (or the last bracket).
    #[test]
    fn bracket_lookup_is_total(table in descending_table(), value in -5000.0f64..5000.0) {
        let i = table.lookup(value);
        prop_assert!(i < table.brackets.len());

        for earlier in &table.brackets[..i] {
            prop_assert!(value < earlier.threshold);
        }
        if i < table.brackets.len() - 1 {
            prop_assert!(value >= table.brackets[i].threshold);
        }
    }

    /// The same value always lands in the same bracket.
    #[test]
    fn bracket_lookup_is_deterministic(table in descending_table(), value in -5000.0f64..5000.0) {
        prop_assert_eq!(table.lookup(value), table.lookup(value));
    }

    /// A window flushed with quorum returns sum / count and empties.
    #[test]
    fn averager_flush_is_mean(values in proptest::collection::vec(-10.0f64..10.0, 48..120)) {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let mut averager = Averager::new(60, 0.8);
        for v in &values {
            averager.accumulate(&Sample::new(*v, now));
        }

        prop_assert!(averager.should_flush(now));
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        let avg = averager.flush().unwrap();
        prop_assert!((avg - expected).abs() < 1e-9);
        prop_assert_eq!(averager.count(), 0);
        prop_assert!(averager.flush().is_err());
    }

    /// Below 80% of the target the window never flushes.
    #[test]
    fn averager_needs_quorum(count in 0usize..48) {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let mut averager = Averager::new(60, 0.8);
        for _ in 0..count {
            averager.accumulate(&Sample::new(1.0, now));
        }
        prop_assert!(!averager.should_flush(now));
    }

    /// After exactly `cal_count` observations the calibrator is frozen and
    /// further observations change nothing.
    #[test]
    fn calibration_freezes(cal_count in 1u32..50, extra in proptest::collection::vec(-10.0f64..10.0, 1..10)) {
        let mut cal = BaselineCalibrator::new(cal_count);
        for _ in 0..cal_count {
            cal.observe(2.0);
        }
        prop_assert!(cal.is_frozen());
        let baseline = cal.baseline().unwrap();
        prop_assert!((baseline - 2.0).abs() < 1e-9);

        for v in extra {
            prop_assert_eq!(cal.observe(v), CalibrationStatus::Frozen);
            prop_assert_eq!(cal.baseline(), Some(baseline));
        }
    }

    /// Staying in one non-nominal bracket within the throttle never re-fires.
    #[test]
    fn non_nominal_repeats_are_throttled(offsets in proptest::collection::vec(1i64..86_400, 1..20)) {
        let classifier = Classifier::Table(
            BracketTable::with_last_nominal(vec![
                Bracket::new(4.0, "Red"),
                Bracket::new(2.7, "Yellow"),
                Bracket::new(0.0, "Green"),
            ])
            .unwrap(),
        );
        let t0 = Local.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let day = Duration::seconds(86_400);
        let mut state = ChannelAlertState::new();

        prop_assert!(evaluate_channel(&classifier, 3.0, &mut state, t0, day).fired);
        for offset in offsets {
            let outcome = evaluate_channel(&classifier, 3.0, &mut state, t0 + Duration::seconds(offset), day);
            prop_assert!(!outcome.fired);
        }
    }
}
