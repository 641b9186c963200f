use crate::models::{StationStats, StatsByStation};

/// Combines worker- or chunk-level statistics with [`StationStats::merge`].
///
/// Because the merge rule is associative and commutative, the result is the
/// same for any grouping of the inputs and any order of arrival.
pub struct Aggregator;

impl Aggregator {
    /// Fold one partial result into `target`. Empty accumulators are ignored.
    pub fn merge_into<I>(target: &mut StatsByStation, partial: I)
    where
        I: IntoIterator<Item = (String, StationStats)>,
    {
        for (station, stats) in partial {
            if stats.is_empty() {
                continue;
            }
            match target.get_mut(&station) {
                Some(existing) => existing.merge(&stats),
                None => {
                    target.insert(station, stats);
                }
            }
        }
    }

    /// Merge every partial result into a fresh map
    pub fn merge_all<P, I>(partials: P) -> StatsByStation
    where
        P: IntoIterator<Item = I>,
        I: IntoIterator<Item = (String, StationStats)>,
    {
        let mut merged = StatsByStation::new();
        for partial in partials {
            Self::merge_into(&mut merged, partial);
        }
        merged
    }
}
