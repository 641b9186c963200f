pub mod results_writer;
pub mod shard_assembler;

pub use results_writer::ResultsWriter;
pub use shard_assembler::ShardAssembler;
