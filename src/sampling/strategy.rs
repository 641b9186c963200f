use crate::error::ProcessingError;
use std::fmt;
use std::str::FromStr;

/// How workers obtain (station, temperature) pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// Random contiguous slices of a shared pre-drawn pool
    #[default]
    Pooled,
    /// A fresh draw per row: uniform station, normal temperature around its baseline
    Independent,
}

impl FromStr for SamplingStrategy {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pooled" | "pool" => Ok(SamplingStrategy::Pooled),
            "independent" | "iid" => Ok(SamplingStrategy::Independent),
            other => Err(ProcessingError::Config(format!(
                "Unknown sampling strategy '{}', expected 'pooled' or 'independent'",
                other
            ))),
        }
    }
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingStrategy::Pooled => write!(f, "pooled"),
            SamplingStrategy::Independent => write!(f, "independent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strategy() {
        assert_eq!("pooled".parse::<SamplingStrategy>().unwrap(), SamplingStrategy::Pooled);
        assert_eq!(
            "Independent".parse::<SamplingStrategy>().unwrap(),
            SamplingStrategy::Independent
        );
        assert!("random".parse::<SamplingStrategy>().is_err());
        assert_eq!(SamplingStrategy::default().to_string(), "pooled");
    }
}
