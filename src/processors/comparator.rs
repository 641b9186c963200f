use crate::models::{
    ExpectedResult, MismatchFields, StationOutcome, StatsByStation, VerificationReport,
};
use crate::utils::constants::{DEFAULT_TOLERANCE, TOLERANCE_SLACK};
use std::collections::BTreeMap;

/// True when `actual` is within `tolerance` of `expected`, inclusive.
///
/// A small slack absorbs binary rounding so that a difference of exactly the
/// tolerance (e.g. `0.3` vs `0.2` at `0.1`) still counts as a match.
pub fn within_tolerance(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance + TOLERANCE_SLACK
}

pub struct Comparator {
    tolerance: f64,
}

impl Comparator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Classify every expected station and collect the computed stations the
    /// expected table does not know about.
    pub fn compare(
        &self,
        computed: &StatsByStation,
        expected: &BTreeMap<String, ExpectedResult>,
    ) -> VerificationReport {
        let outcomes = expected
            .iter()
            .map(|(station, want)| {
                let outcome = match computed.get(station).filter(|s| !s.is_empty()) {
                    None => StationOutcome::Missing {
                        expected: want.clone(),
                    },
                    Some(actual) => {
                        let fields = MismatchFields {
                            min: !within_tolerance(actual.min, want.min, self.tolerance),
                            max: !within_tolerance(actual.max, want.max, self.tolerance),
                            mean: !within_tolerance(actual.mean(), want.mean, self.tolerance),
                        };
                        if fields.any() {
                            StationOutcome::Mismatch {
                                fields,
                                expected: want.clone(),
                                actual: *actual,
                            }
                        } else {
                            StationOutcome::Match
                        }
                    }
                };
                (station.clone(), outcome)
            })
            .collect();

        let extra = computed
            .iter()
            .filter(|(station, stats)| !stats.is_empty() && !expected.contains_key(*station))
            .map(|(station, _)| station.clone())
            .collect();

        VerificationReport {
            outcomes,
            extra,
            tolerance: self.tolerance,
            total_actual: computed.values().filter(|s| !s.is_empty()).count(),
        }
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}
