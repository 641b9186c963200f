use crate::error::{ProcessingError, Result};
use rand::Rng;

/// One pre-drawn row: indices into the station and temperature tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePair {
    pub station: u32,
    pub temperature: u16,
}

/// Fixed pool of uniformly drawn pairs, reused through random contiguous slices.
///
/// Slices drawn from overlapping regions repeat rows across batches, so the
/// output is not an i.i.d. sample. That trade buys generation throughput.
#[derive(Debug, Clone)]
pub struct SamplePool {
    pairs: Vec<SamplePair>,
}

impl SamplePool {
    pub fn build<R: Rng + ?Sized>(
        size: usize,
        num_stations: usize,
        num_buckets: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if size == 0 || num_stations == 0 || num_buckets == 0 {
            return Err(ProcessingError::Config(format!(
                "Cannot build a sample pool of {} pairs over {} stations and {} buckets",
                size, num_stations, num_buckets
            )));
        }
        if num_stations > u32::MAX as usize || num_buckets > u16::MAX as usize + 1 {
            return Err(ProcessingError::Config(
                "Station or temperature table too large for the sample pool".to_string(),
            ));
        }

        let pairs = (0..size)
            .map(|_| SamplePair {
                station: rng.random_range(0..num_stations) as u32,
                temperature: rng.random_range(0..num_buckets) as u16,
            })
            .collect();

        Ok(Self { pairs })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Contiguous slice of `min(n, len)` pairs starting at a random offset in `[0, len - n]`
    pub fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> &[SamplePair] {
        let n = n.min(self.pairs.len());
        let start = rng.random_range(0..=self.pairs.len() - n);
        &self.pairs[start..start + n]
    }
}
