use crate::error::Result;
use crate::models::{ResultRow, StatsByStation};
use std::path::Path;
use tracing::debug;

/// Writes a results table: header `station,min,mean,max`, rows sorted by
/// station name, values rounded to one decimal.
pub struct ResultsWriter;

impl ResultsWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write_results(&self, stats: &StatsByStation, path: &Path) -> Result<usize> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        let mut rows = 0;

        // BTreeMap iteration is already ascending by station name
        for (station, station_stats) in stats.iter().filter(|(_, s)| !s.is_empty()) {
            writer.serialize(ResultRow::from_stats(station, station_stats))?;
            rows += 1;
        }

        if rows == 0 {
            writer.write_record(["station", "min", "mean", "max"])?;
        }

        writer.flush()?;
        debug!(path = %path.display(), rows, "wrote results table");

        Ok(rows)
    }
}

impl Default for ResultsWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StationStats;
    use crate::readers::ResultsReader;
    use tempfile::TempDir;

    #[test]
    fn test_write_results_table() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("results-1k.csv");

        let mut stats = StatsByStation::new();
        let mut palermo = StationStats::from_value(18.04);
        palermo.record(20.0);
        stats.insert("Palermo".to_string(), palermo);
        stats.insert("Hamburg".to_string(), StationStats::from_value(-0.04));

        let rows = ResultsWriter::new().write_results(&stats, &path)?;
        assert_eq!(rows, 2);

        let contents = std::fs::read_to_string(&path)?;
        assert_eq!(
            contents,
            "station,min,mean,max\nHamburg,0.0,0.0,0.0\nPalermo,18.0,19.0,20.0\n"
        );

        let expected = ResultsReader::new().read_expected(&path)?;
        assert_eq!(expected["Palermo"].mean, 19.0);

        Ok(())
    }

    #[test]
    fn test_empty_results_still_have_header() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results-0.csv");

        ResultsWriter::new().write_results(&StatsByStation::new(), &path)?;
        assert_eq!(std::fs::read_to_string(&path)?, "station,min,mean,max\n");

        Ok(())
    }
}
