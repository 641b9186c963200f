use crate::error::{ProcessingError, Result};
use crate::models::ExpectedResult;
use crate::utils::constants::{COLUMN_AVG, COLUMN_MAX, COLUMN_MEAN, COLUMN_MIN, COLUMN_STATION};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Column positions resolved from a results table header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    station: usize,
    min: usize,
    max: usize,
    mean: usize,
}

/// Loads an expected-results table. Accepts both `station,min,mean,max` and
/// the legacy `station,min,max,avg` header, in any column order.
pub struct ResultsReader;

impl ResultsReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_expected(&self, path: &Path) -> Result<BTreeMap<String, ExpectedResult>> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
        let layout = Self::resolve_columns(reader.headers()?, path)?;

        let mut expected = BTreeMap::new();
        for record in reader.records() {
            let record = record?;
            let row = Self::parse_row(&record, layout)?;
            if expected.contains_key(&row.station) {
                warn!(
                    station = %row.station,
                    path = %path.display(),
                    "duplicate station in results table, keeping first row"
                );
                continue;
            }
            expected.insert(row.station.clone(), row);
        }

        Ok(expected)
    }

    fn resolve_columns(headers: &StringRecord, path: &Path) -> Result<ColumnLayout> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |column: &'static str| {
            find(column).ok_or_else(|| ProcessingError::Schema {
                path: path.to_path_buf(),
                column,
            })
        };

        let station = require(COLUMN_STATION)?;
        let min = require(COLUMN_MIN)?;
        let max = require(COLUMN_MAX)?;
        let mean = find(COLUMN_MEAN)
            .or_else(|| find(COLUMN_AVG))
            .ok_or_else(|| ProcessingError::Schema {
                path: path.to_path_buf(),
                column: COLUMN_MEAN,
            })?;

        Ok(ColumnLayout {
            station,
            min,
            max,
            mean,
        })
    }

    fn parse_row(record: &StringRecord, layout: ColumnLayout) -> Result<ExpectedResult> {
        let field = |idx: usize, name: &str| {
            record.get(idx).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!(
                    "Results row {:?} has no '{}' value",
                    record, name
                ))
            })
        };
        let number = |idx: usize, name: &str| -> Result<f64> {
            let raw = field(idx, name)?;
            raw.parse::<f64>().map_err(|_| {
                ProcessingError::InvalidFormat(format!(
                    "Invalid {} value '{}' in results row {:?}",
                    name, raw, record
                ))
            })
        };

        Ok(ExpectedResult {
            station: field(layout.station, COLUMN_STATION)?.to_string(),
            min: number(layout.min, COLUMN_MIN)?,
            max: number(layout.max, COLUMN_MAX)?,
            mean: number(layout.mean, COLUMN_MEAN)?,
        })
    }
}

impl Default for ResultsReader {
    fn default() -> Self {
        Self::new()
    }
}
