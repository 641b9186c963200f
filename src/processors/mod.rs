pub mod aggregator;
pub mod comparator;
pub mod coordinator;
pub mod shard_worker;
pub mod verifier;

pub use aggregator::Aggregator;
pub use comparator::{within_tolerance, Comparator};
pub use coordinator::{
    partition_rows, Coordinator, GenerationOutput, GenerationTimings, GeneratorConfig,
};
pub use shard_worker::{ProgressCounter, ShardOutput, ShardWorker};
pub use verifier::{DatasetVerification, MeasurementVerifier, ScanSummary};
