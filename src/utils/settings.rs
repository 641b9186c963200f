use crate::error::Result;
use crate::utils::constants::{
    DATA_DIR, DEFAULT_BATCH_SIZE, DEFAULT_COPY_BUFFER_SIZE, DEFAULT_MIN_CHUNK_BYTES,
    DEFAULT_MONITOR_THRESHOLD, DEFAULT_POLL_INTERVAL_MS, DEFAULT_POOL_SIZE, DEFAULT_TOLERANCE,
    RESULTS_DIR, SETTINGS_FILE, STATIONS_FILE, VERIFY_DIR,
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Layered settings: built-in defaults, then a TOML file, then `BRC_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    pub verify_dir: PathBuf,
    pub catalog: PathBuf,
    pub tolerance: f64,
    pub batch_size: usize,
    pub pool_size: usize,
    pub monitor_threshold: u64,
    pub poll_interval_ms: u64,
    pub min_chunk_bytes: u64,
    pub copy_buffer_bytes: usize,
}

impl Settings {
    /// Load settings. An explicit `path` must exist; otherwise `brc.toml` in the
    /// working directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            .set_default("data_dir", DATA_DIR)?
            .set_default("results_dir", RESULTS_DIR)?
            .set_default("verify_dir", VERIFY_DIR)?
            .set_default("catalog", STATIONS_FILE)?
            .set_default("tolerance", DEFAULT_TOLERANCE)?
            .set_default("batch_size", DEFAULT_BATCH_SIZE as i64)?
            .set_default("pool_size", DEFAULT_POOL_SIZE as i64)?
            .set_default("monitor_threshold", DEFAULT_MONITOR_THRESHOLD as i64)?
            .set_default("poll_interval_ms", DEFAULT_POLL_INTERVAL_MS as i64)?
            .set_default("min_chunk_bytes", DEFAULT_MIN_CHUNK_BYTES as i64)?
            .set_default("copy_buffer_bytes", DEFAULT_COPY_BUFFER_SIZE as i64)?;

        let builder = match path {
            Some(p) => builder.add_source(File::from(p).required(true)),
            None => builder.add_source(File::from(Path::new(SETTINGS_FILE)).required(false)),
        };

        let settings = builder
            .add_source(Environment::with_prefix("BRC").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;

        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DATA_DIR),
            results_dir: PathBuf::from(RESULTS_DIR),
            verify_dir: PathBuf::from(VERIFY_DIR),
            catalog: PathBuf::from(STATIONS_FILE),
            tolerance: DEFAULT_TOLERANCE,
            batch_size: DEFAULT_BATCH_SIZE,
            pool_size: DEFAULT_POOL_SIZE,
            monitor_threshold: DEFAULT_MONITOR_THRESHOLD,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
            copy_buffer_bytes: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "tolerance = 0.25")?;
        writeln!(file, "batch_size = 1000")?;
        writeln!(file, "data_dir = \"/tmp/brc-data\"")?;

        let settings = Settings::load(Some(file.path()))?;

        assert_eq!(settings.tolerance, 0.25);
        assert_eq!(settings.batch_size, 1000);
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/brc-data"));
        assert_eq!(settings.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(settings.results_dir, PathBuf::from(RESULTS_DIR));

        Ok(())
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/definitely/not/here/brc.toml")));
        assert!(result.is_err());
    }
}
