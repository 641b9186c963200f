use crate::error::{ProcessingError, Result};
use crate::models::{StationCatalog, StationRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Loads a station catalog from JSON (`[{"name": ..., "mean_temp": ...}]`)
/// or from `name;mean` text lines.
pub struct StationReader;

impl StationReader {
    pub fn new() -> Self {
        Self
    }

    /// Read a catalog, choosing the format from the file extension
    pub fn read_catalog(&self, path: &Path) -> Result<StationCatalog> {
        if !path.exists() {
            return Err(ProcessingError::Config(format!(
                "Station catalog not found: {}",
                path.display()
            )));
        }

        let records = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.read_json(path)?,
            _ => self.read_text(path)?,
        };

        debug!(path = %path.display(), stations = records.len(), "loaded station catalog");
        StationCatalog::from_records(records)
    }

    /// Read station records from a JSON array
    pub fn read_json(&self, path: &Path) -> Result<Vec<StationRecord>> {
        let file = File::open(path)?;
        let records: Vec<StationRecord> = serde_json::from_reader(BufReader::new(file))?;
        Ok(records)
    }

    /// Read station records from `name;mean` lines
    pub fn read_text(&self, path: &Path) -> Result<Vec<StationRecord>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (index, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('#') {
                continue;
            }

            records.push(self.parse_station_line(trimmed, index + 1)?);
        }

        Ok(records)
    }

    /// Parse a single `name;mean` line
    fn parse_station_line(&self, line: &str, line_number: usize) -> Result<StationRecord> {
        let (name, mean) = line.rsplit_once(';').ok_or_else(|| {
            ProcessingError::InvalidFormat(format!(
                "Line {}: expected 'name;mean', got '{}'",
                line_number, line
            ))
        })?;

        let mean_temp = mean.trim().parse::<f64>().map_err(|_| {
            ProcessingError::InvalidFormat(format!(
                "Line {}: invalid mean temperature '{}'",
                line_number, mean
            ))
        })?;

        Ok(StationRecord::new(name.trim(), mean_temp))
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}
