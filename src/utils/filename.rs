use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    MEASUREMENTS_EXT, MEASUREMENTS_PREFIX, RESULTS_EXT, RESULTS_PREFIX,
};
use std::path::{Path, PathBuf};

/// Human-readable size tag for a row count: 999, 1k, 1.5k, 10m, 1b
pub fn format_row_count(rows: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "b"), (1_000_000, "m"), (1_000, "k")];

    for (scale, suffix) in UNITS {
        if rows >= scale {
            return if rows % scale == 0 {
                format!("{}{}", rows / scale, suffix)
            } else {
                format!("{:.1}{}", rows as f64 / scale as f64, suffix)
            };
        }
    }

    rows.to_string()
}

/// Parse a row count as accepted on the command line.
///
/// Accepts plain integers (underscores allowed), suffixed forms such as
/// `100k`, `1.5m` and `2b`, and the bare `b` shorthand for one billion.
///
/// # Examples
/// ```
/// use brc_datagen::utils::parse_row_count;
///
/// assert_eq!(parse_row_count("1_000").unwrap(), 1000);
/// assert_eq!(parse_row_count("1.5m").unwrap(), 1_500_000);
/// assert_eq!(parse_row_count("b").unwrap(), 1_000_000_000);
/// ```
pub fn parse_row_count(input: &str) -> Result<u64> {
    let cleaned = input.trim().replace('_', "").to_lowercase();

    if cleaned == "b" {
        return Ok(1_000_000_000);
    }

    if let Ok(rows) = cleaned.parse::<u64>() {
        return Ok(rows);
    }

    let (number, scale) = match cleaned.char_indices().last() {
        Some((idx, 'k')) => (&cleaned[..idx], 1_000u64),
        Some((idx, 'm')) => (&cleaned[..idx], 1_000_000u64),
        Some((idx, 'b')) => (&cleaned[..idx], 1_000_000_000u64),
        _ => {
            return Err(ProcessingError::Config(format!(
                "Invalid row count: '{}'. Expected an integer, a k/m/b suffix, or 'b'",
                input
            )))
        }
    };

    let value = number.parse::<f64>().map_err(|_| {
        ProcessingError::Config(format!("Invalid row count: '{}'", input))
    })?;

    let rows = value * scale as f64;
    if !rows.is_finite() || rows < 0.0 || rows.fract() != 0.0 {
        return Err(ProcessingError::Config(format!(
            "Row count '{}' does not resolve to a whole number of rows",
            input
        )));
    }

    Ok(rows as u64)
}

/// `<data_dir>/measurements-<tag>.txt`
pub fn measurements_path(data_dir: &Path, tag: &str) -> PathBuf {
    data_dir.join(format!("{}{}{}", MEASUREMENTS_PREFIX, tag, MEASUREMENTS_EXT))
}

/// `<dir>/results-<tag>.csv`, used for both expected and recomputed tables
pub fn results_path(dir: &Path, tag: &str) -> PathBuf {
    dir.join(format!("{}{}{}", RESULTS_PREFIX, tag, RESULTS_EXT))
}

/// Size tags of every measurements file present in `data_dir`, sorted
pub fn discover_dataset_tags(data_dir: &Path) -> Result<Vec<String>> {
    let mut tags = Vec::new();

    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        if let Some(tag) = path
            .file_name()
            .and_then(|f| f.to_str())
            .and_then(|name| name.strip_prefix(MEASUREMENTS_PREFIX))
            .and_then(|rest| rest.strip_suffix(MEASUREMENTS_EXT))
        {
            if !tag.is_empty() {
                tags.push(tag.to_string());
            }
        }
    }

    tags.sort();
    Ok(tags)
}
