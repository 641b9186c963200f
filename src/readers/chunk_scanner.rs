use crate::error::Result;
use crate::models::StationStats;
use crate::utils::constants::{FIELD_SEPARATOR, LINE_TERMINATOR};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Half-open byte range `[start, end)` of a measurements file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Statistics recomputed from one byte range.
#[derive(Debug, Clone, Default)]
pub struct ChunkStats {
    pub stations: HashMap<String, StationStats>,
    /// Lines parsed and counted
    pub lines: u64,
    /// Non-blank lines skipped because they could not be parsed
    pub malformed: u64,
}

/// Split `file_size` bytes into at most `workers` ranges of at least
/// `min_chunk` bytes each. The last range always ends at `file_size`.
pub fn plan_chunks(file_size: u64, workers: usize, min_chunk: u64) -> Vec<ByteRange> {
    let workers = workers.max(1) as u64;
    let chunk_size = (file_size / workers).max(min_chunk).max(1);

    let mut ranges = Vec::new();
    for i in 0..workers {
        let start = i * chunk_size;
        if start >= file_size {
            break;
        }
        let end = if i == workers - 1 {
            file_size
        } else {
            (start + chunk_size).min(file_size)
        };
        ranges.push(ByteRange::new(start, end));
    }

    ranges
}

/// Recomputes per-station statistics for the lines attributable to a byte range.
///
/// A line belongs to the range that contains its first byte. A range that
/// does not start at offset 0 therefore discards the fragment up to and
/// including the first line terminator at or after `start - 1`: that line
/// began in the previous range, which reads past its own `end` to finish it.
/// Every line is counted by exactly one range wherever the split points fall.
pub struct ChunkScanner;

impl ChunkScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan `range` of the file at `path`
    pub fn scan(&self, path: &Path, range: ByteRange) -> Result<ChunkStats> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(ChunkStats::default());
        }

        // Safety: the file is opened read-only and not modified while mapped.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(self.scan_bytes(&mmap, range))
    }

    /// Scan `range` of an in-memory (or mapped) file
    pub fn scan_bytes(&self, data: &[u8], range: ByteRange) -> ChunkStats {
        let len = data.len();
        let end = (range.end.min(len as u64)) as usize;
        let mut pos = (range.start.min(len as u64)) as usize;
        let mut chunk = ChunkStats::default();

        if pos > 0 {
            match find_terminator(data, pos - 1) {
                Some(terminator) => pos = terminator + 1,
                None => return chunk,
            }
        }

        while pos < end {
            let (line, next) = match find_terminator(data, pos) {
                Some(terminator) => (&data[pos..terminator], terminator + 1),
                None => (&data[pos..], len),
            };
            pos = next;

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match Self::parse_line(line) {
                Some((station, value)) => {
                    chunk.lines += 1;
                    match chunk.stations.get_mut(station) {
                        Some(stats) => stats.record(value),
                        None => {
                            chunk
                                .stations
                                .insert(station.to_string(), StationStats::from_value(value));
                        }
                    }
                }
                None => chunk.malformed += 1,
            }
        }

        chunk
    }

    /// Parse `station;temperature`. Returns `None` for a missing separator,
    /// an empty station, or a non-numeric temperature.
    pub fn parse_line(line: &[u8]) -> Option<(&str, f64)> {
        let text = std::str::from_utf8(line).ok()?.trim();
        let (station, value) = text.split_once(FIELD_SEPARATOR as char)?;

        if station.is_empty() || value.contains(FIELD_SEPARATOR as char) {
            return None;
        }

        let value = value.trim().parse::<f64>().ok()?;
        value.is_finite().then_some((station, value))
    }
}

impl Default for ChunkScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn find_terminator(data: &[u8], from: usize) -> Option<usize> {
    data[from..]
        .iter()
        .position(|&b| b == LINE_TERMINATOR)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &[u8] = b"Hamburg;12.0\nPalermo;20.5\nHamburg;-3.4\nPalermo;18.0\n";

    fn totals(chunks: &[ChunkStats]) -> (u64, HashMap<String, StationStats>) {
        let mut merged: HashMap<String, StationStats> = HashMap::new();
        let mut lines = 0;
        for chunk in chunks {
            lines += chunk.lines;
            for (name, stats) in &chunk.stations {
                merged.entry(name.clone()).or_default().merge(stats);
            }
        }
        (lines, merged)
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(ChunkScanner::parse_line(b"Hamburg;12.0"), Some(("Hamburg", 12.0)));
        assert_eq!(ChunkScanner::parse_line(b"St. John's;-0.5\r"), Some(("St. John's", -0.5)));
        assert_eq!(ChunkScanner::parse_line(b"Hamburg"), None);
        assert_eq!(ChunkScanner::parse_line(b"Hamburg;warm"), None);
        assert_eq!(ChunkScanner::parse_line(b";1.0"), None);
        assert_eq!(ChunkScanner::parse_line(b"a;1.0;2.0"), None);
        assert_eq!(ChunkScanner::parse_line(b"a;NaN"), None);
    }

    #[test]
    fn test_single_range_reads_everything() {
        let chunk = ChunkScanner::new().scan_bytes(SAMPLE, ByteRange::new(0, SAMPLE.len() as u64));

        assert_eq!(chunk.lines, 4);
        assert_eq!(chunk.malformed, 0);
        let hamburg = chunk.stations["Hamburg"];
        assert_eq!(hamburg.min, -3.4);
        assert_eq!(hamburg.max, 12.0);
        assert_eq!(hamburg.count, 2);
    }

    #[test]
    fn test_every_split_point_counts_each_line_once() {
        let scanner = ChunkScanner::new();
        let whole = scanner.scan_bytes(SAMPLE, ByteRange::new(0, SAMPLE.len() as u64));
        let (_, expected) = totals(&[whole]);

        for split in 0..=SAMPLE.len() as u64 {
            let chunks = [
                scanner.scan_bytes(SAMPLE, ByteRange::new(0, split)),
                scanner.scan_bytes(SAMPLE, ByteRange::new(split, SAMPLE.len() as u64)),
            ];
            let (lines, merged) = totals(&chunks);
            assert_eq!(lines, 4, "split at {}", split);
            assert_eq!(merged, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_range_starting_on_line_boundary_keeps_that_line() {
        // "Hamburg;12.0\n" is 13 bytes, so offset 13 is the start of the Palermo line
        let chunk = ChunkScanner::new().scan_bytes(SAMPLE, ByteRange::new(13, 14));
        assert_eq!(chunk.lines, 1);
        assert!(chunk.stations.contains_key("Palermo"));
    }

    #[test]
    fn test_malformed_lines_are_skipped_and_counted() {
        let data = b"Hamburg;1.0\ngarbage\n\nPalermo;abc\nPalermo;2.0";
        let chunk = ChunkScanner::new().scan_bytes(data, ByteRange::new(0, data.len() as u64));

        assert_eq!(chunk.lines, 2);
        assert_eq!(chunk.malformed, 2);
        assert_eq!(chunk.stations["Palermo"].max, 2.0);
    }

    #[test]
    fn test_plan_chunks_respects_minimum_size() {
        let ranges = plan_chunks(10, 4, 1024);
        assert_eq!(ranges, vec![ByteRange::new(0, 10)]);

        let ranges = plan_chunks(4 * 1024 * 1024 + 3, 4, 1024 * 1024);
        assert_eq!(ranges.len(), 4);
        assert_eq!(ranges[3].end, 4 * 1024 * 1024 + 3);
        assert!(ranges.windows(2).all(|w| w[0].end == w[1].start));

        assert!(plan_chunks(0, 8, 1024).is_empty());
    }

    #[test]
    fn test_scan_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(SAMPLE)?;

        let scanner = ChunkScanner::new();
        let chunk = scanner.scan(file.path(), ByteRange::new(0, SAMPLE.len() as u64))?;
        assert_eq!(chunk.lines, 4);

        let empty = NamedTempFile::new()?;
        let chunk = scanner.scan(empty.path(), ByteRange::new(0, 100))?;
        assert_eq!(chunk.lines, 0);

        Ok(())
    }
}
