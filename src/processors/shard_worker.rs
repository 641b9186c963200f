use crate::error::{ProcessingError, Result};
use crate::models::{StationStats, StatsByStation};
use crate::sampling::{GenerationContext, TemperatureTable};
use crate::utils::constants::{DEFAULT_BATCH_SIZE, DEFAULT_SHARD_BUFFER_SIZE};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Rows written so far across all workers. Workers add one batch at a time;
/// the coordinator only reads it for reporting.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    rows: AtomicU64,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, rows: u64) {
        self.rows.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.rows.load(Ordering::Relaxed)
    }
}

/// Worker-local accumulator in tenths of a degree, indexed by station id
#[derive(Debug, Clone, Copy)]
struct TenthsAccumulator {
    min: i32,
    max: i32,
    sum: i64,
    count: u64,
}

impl TenthsAccumulator {
    fn record(&mut self, tenths: i32) {
        self.min = self.min.min(tenths);
        self.max = self.max.max(tenths);
        self.sum += tenths as i64;
        self.count += 1;
    }

    fn to_stats(self) -> StationStats {
        StationStats {
            min: self.min as f64 / 10.0,
            max: self.max as f64 / 10.0,
            sum: self.sum as f64 / 10.0,
            count: self.count,
        }
    }
}

impl Default for TenthsAccumulator {
    fn default() -> Self {
        Self {
            min: i32::MAX,
            max: i32::MIN,
            sum: 0,
            count: 0,
        }
    }
}

/// Result of one worker's shard
#[derive(Debug, Clone)]
pub struct ShardOutput {
    pub worker_id: usize,
    pub path: PathBuf,
    pub rows: u64,
    pub bytes: u64,
    pub stats: StatsByStation,
}

/// Writes one shard of `name;temperature` rows while accumulating statistics
/// for exactly the rows it wrote.
pub struct ShardWorker {
    worker_id: usize,
    context: Arc<GenerationContext>,
    progress: Arc<ProgressCounter>,
    batch_size: usize,
    seed: Option<u64>,
}

impl ShardWorker {
    pub fn new(
        worker_id: usize,
        context: Arc<GenerationContext>,
        progress: Arc<ProgressCounter>,
    ) -> Self {
        Self {
            worker_id,
            context,
            progress,
            batch_size: DEFAULT_BATCH_SIZE,
            seed: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Write exactly `rows` rows to `path`. Any I/O failure aborts the shard.
    pub fn generate_shard(&self, rows: u64, path: &Path) -> Result<ShardOutput> {
        let file = File::create(path).map_err(|e| self.io_error(path, e))?;
        let mut writer = BufWriter::with_capacity(DEFAULT_SHARD_BUFFER_SIZE, file);

        let context = self.context.as_ref();
        let temperatures = context.temperatures();
        let mut sampler = context.sampler(self.seed);
        let mut accumulators = vec![TenthsAccumulator::default(); context.station_count()];
        let mut buffer: Vec<u8> = Vec::new();

        let mut written = 0u64;
        let mut bytes = 0u64;

        while written < rows {
            let wanted = (rows - written).min(self.batch_size as u64) as usize;
            let batch = sampler.next_batch(wanted);
            if batch.is_empty() {
                return Err(ProcessingError::Config(
                    "Sampler produced an empty batch".to_string(),
                ));
            }

            buffer.clear();
            for pair in batch {
                let station = pair.station as usize;
                let bucket = pair.temperature as usize;
                buffer.extend_from_slice(context.rendered_name(station));
                buffer.extend_from_slice(temperatures.text(bucket));
                accumulators[station].record(TemperatureTable::tenths(bucket));
            }
            let batch_rows = batch.len() as u64;

            writer
                .write_all(&buffer)
                .map_err(|e| self.io_error(path, e))?;

            written += batch_rows;
            bytes += buffer.len() as u64;
            self.progress.add(batch_rows);
        }

        writer.flush().map_err(|e| self.io_error(path, e))?;

        let stats: StatsByStation = accumulators
            .into_iter()
            .enumerate()
            .filter(|(_, acc)| acc.count > 0)
            .map(|(index, acc)| (context.station_name(index).to_string(), acc.to_stats()))
            .collect();

        debug!(
            worker_id = self.worker_id,
            rows = written,
            bytes,
            stations = stats.len(),
            "shard complete"
        );

        Ok(ShardOutput {
            worker_id: self.worker_id,
            path: path.to_path_buf(),
            rows: written,
            bytes,
            stats,
        })
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> ProcessingError {
        ProcessingError::WorkerIo {
            worker_id: self.worker_id,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StationCatalog, StationRecord};
    use crate::readers::{ByteRange, ChunkScanner};
    use crate::sampling::SamplingStrategy;
    use tempfile::TempDir;

    fn context(strategy: SamplingStrategy) -> Arc<GenerationContext> {
        let catalog = StationCatalog::from_records(vec![
            StationRecord::new("Hamburg", 8.0),
            StationRecord::new("Palermo", 18.0),
            StationRecord::new("Oslo", 5.7),
        ])
        .unwrap();
        Arc::new(GenerationContext::build(&catalog, strategy, 1000, Some(9)).unwrap())
    }

    #[test]
    fn test_shard_has_exact_row_count_and_matching_stats() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("shard.txt");
        let progress = Arc::new(ProgressCounter::new());

        let worker = ShardWorker::new(0, context(SamplingStrategy::Pooled), progress.clone())
            .with_batch_size(333)
            .with_seed(Some(1));
        let output = worker.generate_shard(2_500, &path)?;

        assert_eq!(output.rows, 2_500);
        assert_eq!(progress.get(), 2_500);

        let data = std::fs::read(&path)?;
        assert_eq!(output.bytes, data.len() as u64);
        assert_eq!(data.iter().filter(|&&b| b == b'\n').count(), 2_500);

        let scanned = ChunkScanner::new().scan_bytes(&data, ByteRange::new(0, data.len() as u64));
        assert_eq!(scanned.malformed, 0);
        for (station, stats) in &output.stats {
            let recomputed = scanned.stations[station.as_str()];
            assert_eq!(stats.count, recomputed.count);
            assert_eq!(stats.min, recomputed.min);
            assert_eq!(stats.max, recomputed.max);
            assert!((stats.mean() - recomputed.mean()).abs() < 1e-9);
        }

        Ok(())
    }

    #[test]
    fn test_independent_sampling_writes_exact_rows() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("shard.txt");

        let worker = ShardWorker::new(
            3,
            context(SamplingStrategy::Independent),
            Arc::new(ProgressCounter::new()),
        )
        .with_batch_size(64);
        let output = worker.generate_shard(1_000, &path)?;

        let total: u64 = output.stats.values().map(|s| s.count).sum();
        assert_eq!(total, 1_000);
        assert_eq!(output.worker_id, 3);

        Ok(())
    }

    #[test]
    fn test_zero_rows_yields_empty_shard() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("empty.txt");

        let worker = ShardWorker::new(
            0,
            context(SamplingStrategy::Pooled),
            Arc::new(ProgressCounter::new()),
        );
        let output = worker.generate_shard(0, &path)?;

        assert!(output.stats.is_empty());
        assert_eq!(std::fs::metadata(&path)?.len(), 0);

        Ok(())
    }

    #[test]
    fn test_unwritable_shard_reports_worker_io_error() {
        let worker = ShardWorker::new(
            7,
            context(SamplingStrategy::Pooled),
            Arc::new(ProgressCounter::new()),
        );
        let result = worker.generate_shard(10, Path::new("/nonexistent-dir/shard.txt"));

        assert!(matches!(
            result,
            Err(ProcessingError::WorkerIo { worker_id: 7, .. })
        ));
    }
}
