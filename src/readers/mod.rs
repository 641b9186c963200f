pub mod chunk_scanner;
pub mod results_reader;
pub mod station_reader;

pub use chunk_scanner::{plan_chunks, ByteRange, ChunkScanner, ChunkStats};
pub use results_reader::ResultsReader;
pub use station_reader::StationReader;
