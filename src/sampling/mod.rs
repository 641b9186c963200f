pub mod context;
pub mod sample_pool;
pub mod strategy;

pub use context::{GenerationContext, Sampler, TemperatureTable};
pub use sample_pool::{SamplePair, SamplePool};
pub use strategy::SamplingStrategy;
