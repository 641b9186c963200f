use crate::error::{ProcessingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationRecord {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[serde(alias = "mean")]
    #[validate(range(min = -99.9, max = 99.9))]
    pub mean_temp: f64,
}

impl StationRecord {
    pub fn new(name: impl Into<String>, mean_temp: f64) -> Self {
        Self {
            name: name.into(),
            mean_temp,
        }
    }

    /// Names end up verbatim in `name;temp` lines and results tables, so they
    /// may not contain the separator or a line break, nor start or end with
    /// whitespace that either side would trim away.
    pub fn has_line_safe_name(&self) -> bool {
        !self.name.contains([';', '\n', '\r']) && self.name.trim() == self.name
    }
}

/// Immutable, validated set of stations shared by every worker.
#[derive(Debug, Clone)]
pub struct StationCatalog {
    stations: Vec<StationRecord>,
}

impl StationCatalog {
    pub fn from_records(records: Vec<StationRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut stations = Vec::with_capacity(records.len());

        for record in records {
            record.validate()?;

            if !record.has_line_safe_name() {
                return Err(ProcessingError::Config(format!(
                    "Station name {:?} contains a separator, a line break or surrounding whitespace",
                    record.name
                )));
            }

            if !seen.insert(record.name.clone()) {
                warn!(station = %record.name, "duplicate station in catalog, keeping first entry");
                continue;
            }

            stations.push(record);
        }

        if stations.is_empty() {
            return Err(ProcessingError::Config(
                "Station catalog contains no stations".to_string(),
            ));
        }

        Ok(Self { stations })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[StationRecord] {
        &self.stations
    }

    pub fn get(&self, index: usize) -> Option<&StationRecord> {
        self.stations.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_validation() {
        let station = StationRecord::new("Hamburg", 8.0);
        assert!(station.validate().is_ok());
        assert!(station.has_line_safe_name());

        assert!(StationRecord::new("", 8.0).validate().is_err());
        assert!(StationRecord::new("Hot", 150.0).validate().is_err());
        assert!(!StationRecord::new("Bad;Name", 1.0).has_line_safe_name());
    }

    #[test]
    fn test_catalog_deduplicates_names() {
        let catalog = StationCatalog::from_records(vec![
            StationRecord::new("Hamburg", 8.0),
            StationRecord::new("Palermo", 18.0),
            StationRecord::new("Hamburg", 9.0),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0).unwrap().mean_temp, 8.0);
        assert_eq!(catalog.get(1).unwrap().name, "Palermo");
    }

    #[test]
    fn test_catalog_rejects_empty_and_unsafe_names() {
        assert!(matches!(
            StationCatalog::from_records(vec![]),
            Err(ProcessingError::Config(_))
        ));
        assert!(StationCatalog::from_records(vec![StationRecord::new("a\nb", 1.0)]).is_err());
    }

    #[test]
    fn test_catalog_rejects_padded_names() {
        assert!(!StationRecord::new("Hamburg ", 8.0).has_line_safe_name());
        assert!(!StationRecord::new(" Hamburg", 8.0).has_line_safe_name());
        assert!(StationRecord::new("St. John's", 8.0).has_line_safe_name());

        let result = StationCatalog::from_records(vec![
            StationRecord::new("Hamburg ", 8.0),
            StationRecord::new("Palermo", 18.0),
        ]);
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }
}
