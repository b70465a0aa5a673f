//! Delta alerting for the pressure channel.

use serde::{Deserialize, Serialize};

/// Classification of one window average against the frozen baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaClass {
    Nominal,
    /// Outside `[baseline - delta_low, baseline + delta_high]`
    DeltaExceeded,
    /// Magnitude below the absolute floor
    BelowFloor,
    /// Magnitude above the absolute ceiling
    AboveCeiling,
}

impl DeltaClass {
    pub fn is_alert(&self) -> bool {
        !matches!(self, DeltaClass::Nominal)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DeltaClass::Nominal => "",
            DeltaClass::DeltaExceeded => "Alert: vacuum delta.",
            DeltaClass::BelowFloor => "Alert: vacuum less than low limit.",
            DeltaClass::AboveCeiling => "Alert: vacuum greater than high limit.",
        }
    }
}

/// Operator-configured limits, in inches of water column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaLimits {
    pub delta_low: f64,
    pub delta_high: f64,
    pub floor: f64,
    pub ceiling: f64,
}

/// Classifies averages against a baseline; first matching rule wins.
#[derive(Debug, Clone)]
pub struct DeltaAlertEvaluator {
    limits: DeltaLimits,
}

impl DeltaAlertEvaluator {
    pub fn new(limits: DeltaLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &DeltaLimits {
        &self.limits
    }

    pub fn evaluate(&self, avg: f64, baseline: f64) -> DeltaClass {
        let l = &self.limits;
        if avg < baseline - l.delta_low || avg > baseline + l.delta_high {
            DeltaClass::DeltaExceeded
        } else if avg.abs() < l.floor {
            DeltaClass::BelowFloor
        } else if avg.abs() > l.ceiling {
            DeltaClass::AboveCeiling
        } else {
            DeltaClass::Nominal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> DeltaAlertEvaluator {
        DeltaAlertEvaluator::new(DeltaLimits {
            delta_low: 0.4,
            delta_high: 0.4,
            floor: 0.5,
            ceiling: 5.0,
        })
    }

    #[test]
    fn test_nominal_within_band() {
        let e = evaluator();
        assert_eq!(e.evaluate(2.0, 2.0), DeltaClass::Nominal);
        assert_eq!(e.evaluate(2.39, 2.0), DeltaClass::Nominal);
        assert_eq!(e.evaluate(1.61, 2.0), DeltaClass::Nominal);
    }

    #[test]
    fn test_delta_exceeded() {
        let e = evaluator();
        assert_eq!(e.evaluate(1.4, 2.0), DeltaClass::DeltaExceeded);
        assert_eq!(e.evaluate(2.5, 2.0), DeltaClass::DeltaExceeded);
    }

    #[test]
    fn test_asymmetric_deltas() {
        let e = DeltaAlertEvaluator::new(DeltaLimits {
            delta_low: 0.2,
            delta_high: 0.8,
            floor: 0.1,
            ceiling: 10.0,
        });
        assert_eq!(e.evaluate(1.7, 2.0), DeltaClass::DeltaExceeded);
        assert_eq!(e.evaluate(2.7, 2.0), DeltaClass::Nominal);
    }

    #[test]
    fn test_floor_and_ceiling() {
        let e = evaluator();
        // Baseline near the floor: within delta but below the absolute limit.
        assert_eq!(e.evaluate(0.45, 0.5), DeltaClass::BelowFloor);
        assert_eq!(e.evaluate(5.2, 5.0), DeltaClass::AboveCeiling);
    }

    #[test]
    fn test_delta_rule_wins_over_limits() {
        let e = evaluator();
        // Outside the delta band and below the floor at the same time.
        assert_eq!(e.evaluate(0.1, 2.0), DeltaClass::DeltaExceeded);
        // Outside the delta band and above the ceiling at the same time.
        assert_eq!(e.evaluate(7.0, 2.0), DeltaClass::DeltaExceeded);
    }
}
