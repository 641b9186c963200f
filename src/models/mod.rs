pub mod expected;
pub mod report;
pub mod station;
pub mod stats;

pub use expected::{ExpectedResult, ResultRow};
pub use report::{MismatchFields, StationOutcome, VerificationReport};
pub use station::{StationCatalog, StationRecord};
pub use stats::{round_one_decimal, StationStats, StatsByStation};
