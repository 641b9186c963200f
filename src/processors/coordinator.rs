use crate::error::{ProcessingError, Result};
use crate::models::{StationCatalog, StatsByStation};
use crate::processors::aggregator::Aggregator;
use crate::processors::shard_worker::{ProgressCounter, ShardOutput, ShardWorker};
use crate::sampling::{GenerationContext, SamplingStrategy};
use crate::utils::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_COPY_BUFFER_SIZE, DEFAULT_MONITOR_THRESHOLD,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POOL_SIZE,
};
use crate::utils::progress::ProgressReporter;
use crate::writers::{ResultsWriter, ShardAssembler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Split `total` rows over `workers`: every worker gets `total / workers`,
/// the last one also takes the remainder.
pub fn partition_rows(total: u64, workers: usize) -> Vec<u64> {
    if workers == 0 {
        return Vec::new();
    }

    let base = total / workers as u64;
    let mut shares = vec![base; workers];
    if let Some(last) = shares.last_mut() {
        *last += total % workers as u64;
    }
    shares
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub total_rows: u64,
    pub workers: usize,
    pub output_path: PathBuf,
    pub results_path: Option<PathBuf>,
    pub batch_size: usize,
    pub pool_size: usize,
    pub strategy: SamplingStrategy,
    pub seed: Option<u64>,
    pub monitor_threshold: u64,
    pub poll_interval: Duration,
    pub copy_buffer_size: usize,
    /// Directory for worker shards. A temporary directory next to the output
    /// file is used when unset.
    pub staging_dir: Option<PathBuf>,
}

impl GeneratorConfig {
    pub fn new(total_rows: u64, workers: usize, output_path: impl Into<PathBuf>) -> Self {
        Self {
            total_rows,
            workers,
            output_path: output_path.into(),
            results_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            strategy: SamplingStrategy::default(),
            seed: None,
            monitor_threshold: DEFAULT_MONITOR_THRESHOLD,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            staging_dir: None,
        }
    }

    pub fn with_results_path(mut self, path: Option<PathBuf>) -> Self {
        self.results_path = path;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_monitor_threshold(mut self, threshold: u64) -> Self {
        self.monitor_threshold = threshold;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size;
        self
    }

    /// Write shards into an existing directory instead of a temporary one.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Reject configurations that cannot produce the requested file.
    /// Runs before any worker is started.
    pub fn validate(&self) -> Result<()> {
        if self.total_rows == 0 {
            return Err(ProcessingError::Config(
                "Row count must be greater than zero".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(ProcessingError::Config(
                "At least one worker is required".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ProcessingError::Config(
                "Batch size must be greater than zero".to_string(),
            ));
        }
        if self.strategy == SamplingStrategy::Pooled {
            if self.pool_size == 0 {
                return Err(ProcessingError::Config(
                    "Pool size must be greater than zero".to_string(),
                ));
            }
            if self.batch_size > self.pool_size {
                return Err(ProcessingError::Config(format!(
                    "Batch size {} exceeds pool size {}",
                    self.batch_size, self.pool_size
                )));
            }
        }
        if self.output_path.as_os_str().is_empty() || self.output_path.is_dir() {
            return Err(ProcessingError::Config(format!(
                "Output path '{}' is not a file path",
                self.output_path.display()
            )));
        }
        Ok(())
    }

    fn output_dir(&self) -> &Path {
        self.output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationTimings {
    /// Spawn until every worker joined
    pub generation: Duration,
    /// Statistics merge, shard concatenation and results table
    pub merge: Duration,
    pub total: Duration,
}

#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub data_file: PathBuf,
    pub results_file: Option<PathBuf>,
    pub stats: StatsByStation,
    pub rows: u64,
    pub bytes_written: u64,
    pub timings: GenerationTimings,
}

impl GenerationOutput {
    /// Rows per second over the whole run
    pub fn throughput(&self) -> f64 {
        let secs = self.timings.total.as_secs_f64();
        if secs > 0.0 {
            self.rows as f64 / secs
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Generation Summary ===\n");
        summary.push_str(&format!("Data file:        {}\n", self.data_file.display()));
        if let Some(ref results) = self.results_file {
            summary.push_str(&format!("Results file:     {}\n", results.display()));
        }
        summary.push_str(&format!("Rows written:     {}\n", self.rows));
        summary.push_str(&format!(
            "File size:        {:.2} MB\n",
            self.bytes_written as f64 / (1024.0 * 1024.0)
        ));
        summary.push_str(&format!("Stations seen:    {}\n", self.stats.len()));
        summary.push_str(&format!(
            "Generation time:  {:.2}s\n",
            self.timings.generation.as_secs_f64()
        ));
        summary.push_str(&format!(
            "Merge time:       {:.2}s\n",
            self.timings.merge.as_secs_f64()
        ));
        summary.push_str(&format!(
            "Total time:       {:.2}s\n",
            self.timings.total.as_secs_f64()
        ));
        summary.push_str(&format!("Throughput:       {:.0} rows/s\n", self.throughput()));

        summary
    }
}

/// Runs one generation: partitions rows, drives the workers, monitors
/// progress and assembles the final file and results table.
pub struct Coordinator {
    config: GeneratorConfig,
    context: Arc<GenerationContext>,
}

impl Coordinator {
    pub fn new(config: GeneratorConfig, catalog: &StationCatalog) -> Result<Self> {
        config.validate()?;
        let context = GenerationContext::build(
            catalog,
            config.strategy,
            config.pool_size,
            config.seed,
        )?;
        Ok(Self {
            config,
            context: Arc::new(context),
        })
    }

    /// Reuse an already built context, e.g. across several runs. Sampling
    /// settings come from the context, so the config must ask for the same
    /// strategy and its batch size must fit the context's pool.
    pub fn with_context(
        mut config: GeneratorConfig,
        context: Arc<GenerationContext>,
    ) -> Result<Self> {
        if config.strategy != context.strategy() {
            return Err(ProcessingError::Config(format!(
                "Config asks for {} sampling but the context was built for {}",
                config.strategy,
                context.strategy()
            )));
        }
        if let Some(pool) = context.pool() {
            config.pool_size = pool.len();
        }
        config.validate()?;
        Ok(Self { config, context })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub async fn run(&self, progress: Option<&ProgressReporter>) -> Result<GenerationOutput> {
        let started = Instant::now();
        let config = &self.config;

        let output_dir = config.output_dir();
        std::fs::create_dir_all(output_dir)?;
        let (shard_dir, staging) = match config.staging_dir {
            Some(ref dir) => (dir.clone(), None),
            None => {
                let staging = tempfile::Builder::new()
                    .prefix(".shards-")
                    .tempdir_in(output_dir)?;
                (staging.path().to_path_buf(), Some(staging))
            }
        };

        let shares = partition_rows(config.total_rows, config.workers);
        let counter = Arc::new(ProgressCounter::new());

        info!(
            rows = config.total_rows,
            workers = config.workers,
            stations = self.context.station_count(),
            strategy = %config.strategy,
            "starting generation"
        );

        let mut shard_paths = Vec::with_capacity(shares.len());
        let mut handles: Vec<JoinHandle<Result<ShardOutput>>> = Vec::with_capacity(shares.len());
        for (worker_id, rows) in shares.iter().copied().enumerate() {
            let path = shard_dir.join(format!("shard-{:04}.txt", worker_id));
            shard_paths.push(path.clone());

            let worker = ShardWorker::new(worker_id, Arc::clone(&self.context), Arc::clone(&counter))
                .with_batch_size(config.batch_size)
                .with_seed(config.seed.map(|s| s.wrapping_add(worker_id as u64 + 1)));

            debug!(worker_id, rows, "spawning worker");
            handles.push(tokio::task::spawn_blocking(move || {
                worker.generate_shard(rows, &path)
            }));
        }

        self.monitor(&handles, &counter, started, progress).await;

        // Every worker has finished; collect in worker order.
        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            outputs.push(handle.await??);
        }
        let generation = started.elapsed();

        let merge_started = Instant::now();
        let mut stats = StatsByStation::new();
        let mut rows = 0u64;
        for output in outputs {
            rows += output.rows;
            Aggregator::merge_into(&mut stats, output.stats);
        }
        if rows != config.total_rows {
            return Err(ProcessingError::MissingData(format!(
                "Workers produced {} of {} requested rows",
                rows, config.total_rows
            )));
        }

        info!(stations = stats.len(), "merged worker statistics");

        if let Some(p) = progress {
            p.set_message("Assembling shards...");
        }
        let assembler = ShardAssembler::new().with_buffer_size(config.copy_buffer_size);
        let destination = config.output_path.clone();
        let bytes_written =
            tokio::task::spawn_blocking(move || assembler.assemble(&shard_paths, &destination))
                .await??;
        drop(staging);

        if let Some(ref results_path) = config.results_path {
            let written = ResultsWriter::new().write_results(&stats, results_path)?;
            info!(stations = written, path = %results_path.display(), "wrote results table");
        }

        let timings = GenerationTimings {
            generation,
            merge: merge_started.elapsed(),
            total: started.elapsed(),
        };

        info!(
            rows,
            bytes = bytes_written,
            total_secs = timings.total.as_secs_f64(),
            "generation complete"
        );

        Ok(GenerationOutput {
            data_file: config.output_path.clone(),
            results_file: config.results_path.clone(),
            stats,
            rows,
            bytes_written,
            timings,
        })
    }

    /// Poll the shared counter until every worker has finished, logging
    /// whenever progress since the last line reaches the threshold.
    async fn monitor(
        &self,
        handles: &[JoinHandle<Result<ShardOutput>>],
        counter: &ProgressCounter,
        started: Instant,
        progress: Option<&ProgressReporter>,
    ) {
        let total = self.config.total_rows;
        let threshold = self.config.monitor_threshold;
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_logged = 0u64;

        loop {
            ticker.tick().await;
            let current = counter.get();
            if let Some(p) = progress {
                p.update(current);
            }

            let finished = handles.iter().all(JoinHandle::is_finished);
            if current > last_logged && (current - last_logged >= threshold || finished) {
                log_progress(current, total, started.elapsed());
                last_logged = current;
            }

            if finished {
                break;
            }
        }
    }
}

fn log_progress(current: u64, total: u64, elapsed: Duration) {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { current as f64 / secs } else { 0.0 };
    let percent = if total > 0 {
        current as f64 * 100.0 / total as f64
    } else {
        100.0
    };
    info!(
        "Progress: {}/{} rows ({:.1}%) {:.0} rows/s",
        current, total, percent, rate
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_rows() {
        assert_eq!(partition_rows(10, 3), vec![3, 3, 4]);
        assert_eq!(partition_rows(9, 3), vec![3, 3, 3]);
        assert_eq!(partition_rows(2, 4), vec![0, 0, 0, 2]);
        assert_eq!(partition_rows(7, 1), vec![7]);
        assert!(partition_rows(7, 0).is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let ok = GeneratorConfig::new(100, 2, "data/out.txt")
            .with_pool_size(1000)
            .with_batch_size(100);
        assert!(ok.validate().is_ok());

        assert!(GeneratorConfig::new(0, 2, "out.txt").validate().is_err());
        assert!(GeneratorConfig::new(10, 0, "out.txt").validate().is_err());
        assert!(GeneratorConfig::new(10, 1, "out.txt")
            .with_batch_size(0)
            .validate()
            .is_err());
        assert!(GeneratorConfig::new(10, 1, "out.txt")
            .with_pool_size(10)
            .with_batch_size(20)
            .validate()
            .is_err());
        assert!(GeneratorConfig::new(10, 1, "").validate().is_err());
    }

    #[test]
    fn test_independent_ignores_pool_limits() {
        let config = GeneratorConfig::new(10, 1, "out.txt")
            .with_strategy(SamplingStrategy::Independent)
            .with_pool_size(0)
            .with_batch_size(50);
        assert!(config.validate().is_ok());
    }

    fn context(strategy: SamplingStrategy, pool_size: usize) -> Arc<GenerationContext> {
        let catalog = StationCatalog::from_records(vec![
            crate::models::StationRecord::new("Hamburg", 8.0),
            crate::models::StationRecord::new("Palermo", 18.0),
        ])
        .unwrap();
        Arc::new(GenerationContext::build(&catalog, strategy, pool_size, Some(3)).unwrap())
    }

    #[test]
    fn test_with_context_rejects_strategy_mismatch() {
        let config = GeneratorConfig::new(10, 1, "out.txt")
            .with_strategy(SamplingStrategy::Independent)
            .with_batch_size(5);
        let result = Coordinator::with_context(config, context(SamplingStrategy::Pooled, 100));

        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_with_context_checks_batch_against_real_pool() {
        // The config claims a large pool, the context only holds 100 samples.
        let too_large = GeneratorConfig::new(10, 1, "out.txt")
            .with_pool_size(10_000)
            .with_batch_size(500);
        assert!(matches!(
            Coordinator::with_context(too_large, context(SamplingStrategy::Pooled, 100)),
            Err(ProcessingError::Config(_))
        ));

        let fits = GeneratorConfig::new(10, 1, "out.txt")
            .with_pool_size(10_000)
            .with_batch_size(50);
        let coordinator = Coordinator::with_context(fits, context(SamplingStrategy::Pooled, 100))
            .unwrap();
        assert_eq!(coordinator.config().pool_size, 100);
    }

    #[test]
    fn test_output_dir_defaults_to_current() {
        let config = GeneratorConfig::new(1, 1, "out.txt");
        assert_eq!(config.output_dir(), Path::new("."));

        let nested = GeneratorConfig::new(1, 1, "data/out.txt");
        assert_eq!(nested.output_dir(), Path::new("data"));
    }
}
