use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-station statistics keyed by station name, iterated in ascending name order.
pub type StatsByStation = BTreeMap<String, StationStats>;

/// Running min/max/sum/count for one station.
///
/// The default value is the identity of [`StationStats::merge`]: an empty
/// accumulator with `count == 0` that leaves any other value unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl StationStats {
    pub fn from_value(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            sum: value,
            count: 1,
        }
    }

    pub fn record(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.sum += value;
        self.count += 1;
    }

    /// Combine `other` into `self`. Associative and commutative, so merged
    /// results do not depend on partition shape or merge order.
    pub fn merge(&mut self, other: &StationStats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    pub fn merged(mut self, other: &StationStats) -> Self {
        self.merge(other);
        self
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for StationStats {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            count: 0,
        }
    }
}

/// Round to one decimal place, normalising negative zero.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0 + 0.0
}
