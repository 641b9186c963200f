use crate::models::stats::{round_one_decimal, StationStats};
use serde::Serialize;

/// One row of a persisted results table, as loaded for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedResult {
    pub station: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ExpectedResult {
    pub fn new(station: impl Into<String>, min: f64, max: f64, mean: f64) -> Self {
        Self {
            station: station.into(),
            min,
            max,
            mean,
        }
    }
}

/// Written row of a results table: `station,min,mean,max`, one decimal each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub station: String,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl ResultRow {
    pub fn from_stats(station: &str, stats: &StationStats) -> Self {
        Self {
            station: station.to_string(),
            min: round_one_decimal(stats.min),
            mean: round_one_decimal(stats.mean()),
            max: round_one_decimal(stats.max),
        }
    }
}
