use crate::models::expected::ExpectedResult;
use crate::models::stats::StationStats;
use crate::utils::constants::{MAX_REPORTED_EXTRAS, MAX_REPORTED_MISMATCHES};
use std::collections::BTreeMap;
use std::fmt;

/// Which statistics of a station fell outside tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MismatchFields {
    pub min: bool,
    pub max: bool,
    pub mean: bool,
}

impl MismatchFields {
    pub fn any(&self) -> bool {
        self.min || self.max || self.mean
    }
}

impl fmt::Display for MismatchFields {
    /// `MIN_MISMATCH`, `MAX+MEAN_MISMATCH`, ...
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [(self.min, "MIN"), (self.max, "MAX"), (self.mean, "MEAN")]
            .into_iter()
            .filter_map(|(failed, name)| failed.then_some(name))
            .collect();
        write!(f, "{}_MISMATCH", parts.join("+"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StationOutcome {
    Match,
    Mismatch {
        fields: MismatchFields,
        expected: ExpectedResult,
        actual: StationStats,
    },
    Missing {
        expected: ExpectedResult,
    },
}

impl StationOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, StationOutcome::Match)
    }

    pub fn label(&self) -> String {
        match self {
            StationOutcome::Match => "MATCH".to_string(),
            StationOutcome::Mismatch { fields, .. } => fields.to_string(),
            StationOutcome::Missing { .. } => "MISSING".to_string(),
        }
    }
}

/// Per-station classification of a computed result against an expected table.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub outcomes: BTreeMap<String, StationOutcome>,
    /// Computed stations with no expected row, sorted
    pub extra: Vec<String>,
    pub tolerance: f64,
    pub total_actual: usize,
}

impl VerificationReport {
    pub fn matched(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_match()).count()
    }

    pub fn mismatched(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, StationOutcome::Mismatch { .. }))
            .count()
    }

    pub fn missing(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, StationOutcome::Missing { .. }))
            .count()
    }

    pub fn total_expected(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_success(&self) -> bool {
        self.mismatched() == 0 && self.missing() == 0 && self.extra.is_empty()
    }

    /// Non-matching outcomes in station order
    pub fn failures(&self) -> impl Iterator<Item = (&String, &StationOutcome)> {
        self.outcomes.iter().filter(|(_, o)| !o.is_match())
    }

    pub fn outcome(&self, station: &str) -> Option<&StationOutcome> {
        self.outcomes.get(station)
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Verification Results ===\n");
        summary.push_str(&format!(
            "Matched stations:    {}/{}\n",
            self.matched(),
            self.total_expected()
        ));
        summary.push_str(&format!("Mismatched stations: {}\n", self.mismatched()));
        summary.push_str(&format!("Missing stations:    {}\n", self.missing()));
        summary.push_str(&format!("Extra stations:      {}\n", self.extra.len()));
        summary.push_str(&format!("Total expected:      {}\n", self.total_expected()));
        summary.push_str(&format!("Total actual:        {}\n", self.total_actual));
        summary.push_str(&format!("Tolerance:           ±{}°C\n", self.tolerance));

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            summary.push_str("\nDetailed mismatches:\n");
            for (station, outcome) in failures.iter().take(MAX_REPORTED_MISMATCHES) {
                summary.push_str(&format!("  {}: {}\n", station, outcome.label()));
                if let StationOutcome::Mismatch {
                    fields,
                    expected,
                    actual,
                } = outcome
                {
                    let rows = [
                        (fields.min, "Min", expected.min, actual.min),
                        (fields.max, "Max", expected.max, actual.max),
                        (fields.mean, "Mean", expected.mean, actual.mean()),
                    ];
                    for (failed, name, want, got) in rows {
                        if failed {
                            summary.push_str(&format!(
                                "    {:<5} expected={:.1}, actual={:.1}, diff={:.1}\n",
                                format!("{}:", name),
                                want,
                                got,
                                (want - got).abs()
                            ));
                        }
                    }
                }
            }
            if failures.len() > MAX_REPORTED_MISMATCHES {
                summary.push_str(&format!(
                    "  ... and {} more\n",
                    failures.len() - MAX_REPORTED_MISMATCHES
                ));
            }
        }

        if !self.extra.is_empty() {
            let shown: Vec<&str> = self
                .extra
                .iter()
                .take(MAX_REPORTED_EXTRAS)
                .map(String::as_str)
                .collect();
            summary.push_str(&format!("\nExtra stations: {}\n", shown.join(", ")));
            if self.extra.len() > MAX_REPORTED_EXTRAS {
                summary.push_str(&format!(
                    "  ... and {} more\n",
                    self.extra.len() - MAX_REPORTED_EXTRAS
                ));
            }
        }

        summary.push_str(if self.is_success() {
            "\n[PASS] All results match expected values\n"
        } else {
            "\n[FAIL] Discrepancies found\n"
        });

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_labels() {
        let only_max = MismatchFields {
            max: true,
            ..Default::default()
        };
        assert_eq!(only_max.to_string(), "MAX_MISMATCH");

        let all = MismatchFields {
            min: true,
            max: true,
            mean: true,
        };
        assert_eq!(all.to_string(), "MIN+MAX+MEAN_MISMATCH");
        assert!(!MismatchFields::default().any());
    }

    #[test]
    fn test_report_counts() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("A".to_string(), StationOutcome::Match);
        outcomes.insert(
            "B".to_string(),
            StationOutcome::Missing {
                expected: ExpectedResult::new("B", 0.0, 1.0, 0.5),
            },
        );

        let report = VerificationReport {
            outcomes,
            extra: vec!["C".to_string()],
            tolerance: 0.1,
            total_actual: 2,
        };

        assert_eq!(report.matched(), 1);
        assert_eq!(report.missing(), 1);
        assert_eq!(report.mismatched(), 0);
        assert!(!report.is_success());
        assert!(report.summary().contains("Extra stations: C"));
        assert!(report.summary().contains("B: MISSING"));
    }
}
