/// File and directory names
pub const STATIONS_FILE: &str = "stations.json";
pub const SETTINGS_FILE: &str = "brc.toml";
pub const DATA_DIR: &str = "data";
pub const RESULTS_DIR: &str = "results";
pub const VERIFY_DIR: &str = "verify";
pub const MEASUREMENTS_PREFIX: &str = "measurements-";
pub const MEASUREMENTS_EXT: &str = ".txt";
pub const RESULTS_PREFIX: &str = "results-";
pub const RESULTS_EXT: &str = ".csv";

/// Line format
pub const FIELD_SEPARATOR: u8 = b';';
pub const LINE_TERMINATOR: u8 = b'\n';

/// Temperature discretisation, in tenths of a degree
pub const MIN_TEMP_TENTHS: i32 = -2000;
pub const MAX_TEMP_TENTHS: i32 = 2000;
pub const TEMP_BUCKETS: usize = (MAX_TEMP_TENTHS - MIN_TEMP_TENTHS + 1) as usize;

/// Independent sampling spread around a station baseline
pub const INDEPENDENT_STD_DEV: f64 = 10.0;

/// Generation defaults
pub const DEFAULT_POOL_SIZE: usize = 5_000_000;
pub const DEFAULT_BATCH_SIZE: usize = 200_000;
pub const DEFAULT_MONITOR_THRESHOLD: u64 = 5_000_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_SHARD_BUFFER_SIZE: usize = 8 * 1024 * 1024; // 8MB
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Verification defaults
pub const DEFAULT_TOLERANCE: f64 = 0.1;
pub const TOLERANCE_SLACK: f64 = 1e-9;
pub const DEFAULT_MIN_CHUNK_BYTES: u64 = 1024 * 1024; // 1MB
pub const MAX_REPORTED_MISMATCHES: usize = 20;
pub const MAX_REPORTED_EXTRAS: usize = 10;

/// Results table columns
pub const COLUMN_STATION: &str = "station";
pub const COLUMN_MIN: &str = "min";
pub const COLUMN_MAX: &str = "max";
pub const COLUMN_MEAN: &str = "mean";
pub const COLUMN_AVG: &str = "avg";
