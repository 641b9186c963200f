pub mod constants;
pub mod filename;
pub mod logging;
pub mod progress;
pub mod settings;

pub use constants::*;
pub use filename::{
    discover_dataset_tags, format_row_count, measurements_path, parse_row_count, results_path,
};
pub use logging::{init_logging, log_level};
pub use progress::ProgressReporter;
pub use settings::Settings;
