use crate::error::{ProcessingError, Result};
use crate::models::{ExpectedResult, StatsByStation, VerificationReport};
use crate::processors::aggregator::Aggregator;
use crate::processors::comparator::Comparator;
use crate::readers::{plan_chunks, ChunkScanner, ChunkStats, ResultsReader};
use crate::utils::constants::{
    DATA_DIR, DEFAULT_MIN_CHUNK_BYTES, DEFAULT_TOLERANCE, RESULTS_DIR, VERIFY_DIR,
};
use crate::utils::filename::{measurements_path, results_path};
use crate::writers::ResultsWriter;
use memmap2::Mmap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Statistics recomputed from a measurements file
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub stats: StatsByStation,
    pub lines: u64,
    pub malformed: u64,
    pub chunks: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Outcome of verifying one dataset tag
#[derive(Debug, Clone)]
pub struct DatasetVerification {
    pub tag: String,
    pub data_file: PathBuf,
    pub results_file: PathBuf,
    pub audit_file: PathBuf,
    pub scan: ScanSummary,
    pub report: VerificationReport,
}

impl DatasetVerification {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("=== Dataset {} ===\n", self.tag));
        summary.push_str(&format!("Data file:      {}\n", self.data_file.display()));
        summary.push_str(&format!("Expected file:  {}\n", self.results_file.display()));
        summary.push_str(&format!("Audit file:     {}\n", self.audit_file.display()));
        summary.push_str(&format!("Lines scanned:  {}\n", self.scan.lines));
        if self.scan.malformed > 0 {
            summary.push_str(&format!("Malformed:      {}\n", self.scan.malformed));
        }
        summary.push_str(&format!(
            "Scan time:      {:.2}s over {} chunks\n\n",
            self.scan.elapsed.as_secs_f64(),
            self.scan.chunks
        ));
        summary.push_str(&self.report.summary());

        summary
    }
}

/// Recomputes statistics from a measurements file in parallel chunks and
/// checks them against the persisted results table.
#[derive(Debug, Clone)]
pub struct MeasurementVerifier {
    workers: usize,
    tolerance: f64,
    min_chunk_bytes: u64,
    data_dir: PathBuf,
    results_dir: PathBuf,
    verify_dir: PathBuf,
}

impl MeasurementVerifier {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            tolerance: DEFAULT_TOLERANCE,
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
            data_dir: PathBuf::from(DATA_DIR),
            results_dir: PathBuf::from(RESULTS_DIR),
            verify_dir: PathBuf::from(VERIFY_DIR),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_min_chunk_bytes(mut self, min_chunk_bytes: u64) -> Self {
        self.min_chunk_bytes = min_chunk_bytes.max(1);
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }

    pub fn with_verify_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.verify_dir = dir.into();
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Scan the whole file with one rayon task per byte range and merge the
    /// chunk results once every task has returned.
    pub fn calculate_statistics(&self, path: &Path) -> Result<ScanSummary> {
        let started = Instant::now();
        let file = File::open(path)?;
        let bytes = file.metadata()?.len();

        if bytes == 0 {
            warn!(path = %path.display(), "measurements file is empty");
            return Ok(ScanSummary {
                elapsed: started.elapsed(),
                ..Default::default()
            });
        }

        // Safety: the file is opened read-only and not modified while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        let ranges = plan_chunks(bytes, self.workers, self.min_chunk_bytes);
        debug!(chunks = ranges.len(), bytes, "scanning measurements");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers.min(ranges.len()).max(1))
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let scanner = ChunkScanner::new();
        let data: &[u8] = &mmap;
        let chunks: Vec<ChunkStats> = pool.install(|| {
            ranges
                .par_iter()
                .map(|range| scanner.scan_bytes(data, *range))
                .collect()
        });

        let lines = chunks.iter().map(|c| c.lines).sum();
        let malformed = chunks.iter().map(|c| c.malformed).sum();
        if malformed > 0 {
            warn!(malformed, path = %path.display(), "skipped malformed lines");
        }
        let stats = Aggregator::merge_all(chunks.into_iter().map(|c| c.stations));

        Ok(ScanSummary {
            stats,
            lines,
            malformed,
            chunks: ranges.len(),
            bytes,
            elapsed: started.elapsed(),
        })
    }

    /// Load `results-<tag>.csv`, recompute `measurements-<tag>.txt`, write the
    /// recomputed table to the audit directory and compare.
    pub fn verify_dataset(&self, tag: &str) -> Result<DatasetVerification> {
        let data_file = measurements_path(&self.data_dir, tag);
        let results_file = results_path(&self.results_dir, tag);

        if !data_file.is_file() {
            return Err(ProcessingError::MissingData(format!(
                "Measurement file not found: {}",
                data_file.display()
            )));
        }
        if !results_file.is_file() {
            return Err(ProcessingError::MissingData(format!(
                "Results file not found: {}",
                results_file.display()
            )));
        }

        let expected: BTreeMap<String, ExpectedResult> =
            ResultsReader::new().read_expected(&results_file)?;
        info!(tag, stations = expected.len(), "loaded expected results");

        let scan = self.calculate_statistics(&data_file)?;
        info!(
            tag,
            lines = scan.lines,
            stations = scan.stats.len(),
            secs = scan.elapsed.as_secs_f64(),
            "recomputed statistics"
        );

        let audit_file = results_path(&self.verify_dir, tag);
        ResultsWriter::new().write_results(&scan.stats, &audit_file)?;

        let report = Comparator::new(self.tolerance).compare(&scan.stats, &expected);
        if report.is_success() {
            info!(tag, matched = report.matched(), "verification passed");
        } else {
            warn!(
                tag,
                mismatched = report.mismatched(),
                missing = report.missing(),
                extra = report.extra.len(),
                "verification failed"
            );
        }

        Ok(DatasetVerification {
            tag: tag.to_string(),
            data_file,
            results_file,
            audit_file,
            scan,
            report,
        })
    }
}

impl Default for MeasurementVerifier {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn verifier(root: &Path) -> MeasurementVerifier {
        MeasurementVerifier::new(4)
            .with_min_chunk_bytes(8)
            .with_data_dir(root.join("data"))
            .with_results_dir(root.join("results"))
            .with_verify_dir(root.join("verify"))
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_calculate_statistics_across_chunks() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("m.txt");
        write(&path, "A;1.0\nB;2.0\nA;3.0\nB;-4.0\nbroken\nA;-1.0\n");

        let scan = verifier(dir.path()).calculate_statistics(&path)?;

        assert_eq!(scan.lines, 5);
        assert_eq!(scan.malformed, 1);
        assert!(scan.chunks > 1);
        assert_eq!(scan.stats["A"].count, 3);
        assert_eq!(scan.stats["A"].min, -1.0);
        assert_eq!(scan.stats["B"].max, 2.0);

        Ok(())
    }

    #[test]
    fn test_empty_file_has_no_stats() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("empty.txt");
        write(&path, "");

        let scan = verifier(dir.path()).calculate_statistics(&path)?;
        assert!(scan.stats.is_empty());
        assert_eq!(scan.lines, 0);

        Ok(())
    }

    #[test]
    fn test_verify_dataset_writes_audit_and_passes() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        write(
            &root.join("data/measurements-6.txt"),
            "A;1.0\nB;2.0\nA;3.0\nB;-4.0\nA;-1.0\nB;0.5\n",
        );
        write(
            &root.join("results/results-6.csv"),
            "station,min,mean,max\nA,-1.0,1.0,3.0\nB,-4.0,-0.5,2.0\n",
        );

        let outcome = verifier(root).verify_dataset("6")?;

        assert!(outcome.is_success(), "{}", outcome.summary());
        assert_eq!(outcome.report.matched(), 2);
        let audit = fs::read_to_string(root.join("verify/results-6.csv"))?;
        assert!(audit.starts_with("station,min,mean,max\n"));

        Ok(())
    }

    #[test]
    fn test_missing_dataset_is_reported() {
        let dir = TempDir::new().unwrap();
        let result = verifier(dir.path()).verify_dataset("1k");
        assert!(matches!(result, Err(ProcessingError::MissingData(_))));
    }
}
