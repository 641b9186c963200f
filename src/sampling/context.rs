use crate::error::{ProcessingError, Result};
use crate::models::StationCatalog;
use crate::sampling::sample_pool::{SamplePair, SamplePool};
use crate::sampling::strategy::SamplingStrategy;
use crate::utils::constants::{
    FIELD_SEPARATOR, INDEPENDENT_STD_DEV, LINE_TERMINATOR, MAX_TEMP_TENTHS, MIN_TEMP_TENTHS,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Pre-rendered `"<t>\n"` text for every temperature bucket from -200.0 to 200.0.
#[derive(Debug, Clone)]
pub struct TemperatureTable {
    texts: Vec<Box<[u8]>>,
}

impl TemperatureTable {
    pub fn new() -> Self {
        let texts = (MIN_TEMP_TENTHS..=MAX_TEMP_TENTHS)
            .map(|tenths| {
                let sign = if tenths < 0 { "-" } else { "" };
                let abs = tenths.unsigned_abs();
                let mut text = format!("{}{}.{}", sign, abs / 10, abs % 10).into_bytes();
                text.push(LINE_TERMINATOR);
                text.into_boxed_slice()
            })
            .collect();

        Self { texts }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Rendered text of a bucket, including the line terminator
    pub fn text(&self, index: usize) -> &[u8] {
        &self.texts[index]
    }

    /// Temperature of a bucket in tenths of a degree
    pub fn tenths(index: usize) -> i32 {
        index as i32 + MIN_TEMP_TENTHS
    }

    /// Bucket holding `celsius`, rounded to the nearest tenth and clamped to the table
    pub fn index_of(celsius: f64) -> usize {
        let tenths = (celsius * 10.0).round() as i64;
        let clamped = tenths.clamp(MIN_TEMP_TENTHS as i64, MAX_TEMP_TENTHS as i64);
        (clamped - MIN_TEMP_TENTHS as i64) as usize
    }
}

impl Default for TemperatureTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable lookup tables shared by every worker of a run.
///
/// Built once before any worker starts and handed to workers behind an `Arc`;
/// nothing in it changes afterwards.
#[derive(Debug)]
pub struct GenerationContext {
    names: Vec<String>,
    rendered_names: Vec<Box<[u8]>>,
    baselines: Vec<Normal<f64>>,
    temperatures: TemperatureTable,
    strategy: SamplingStrategy,
    pool: Option<SamplePool>,
}

impl GenerationContext {
    pub fn build(
        catalog: &StationCatalog,
        strategy: SamplingStrategy,
        pool_size: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(ProcessingError::Config(
                "Cannot generate data from an empty station catalog".to_string(),
            ));
        }

        let names: Vec<String> = catalog.stations().iter().map(|s| s.name.clone()).collect();
        let rendered_names = names
            .iter()
            .map(|name| {
                let mut bytes = Vec::with_capacity(name.len() + 1);
                bytes.extend_from_slice(name.as_bytes());
                bytes.push(FIELD_SEPARATOR);
                bytes.into_boxed_slice()
            })
            .collect();

        let baselines = catalog
            .stations()
            .iter()
            .map(|s| {
                Normal::new(s.mean_temp, INDEPENDENT_STD_DEV).map_err(|e| {
                    ProcessingError::Config(format!(
                        "Invalid baseline for station {}: {}",
                        s.name, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let temperatures = TemperatureTable::new();

        let pool = match strategy {
            SamplingStrategy::Pooled => {
                let mut rng = seeded_rng(seed);
                Some(SamplePool::build(
                    pool_size,
                    names.len(),
                    temperatures.len(),
                    &mut rng,
                )?)
            }
            SamplingStrategy::Independent => None,
        };

        Ok(Self {
            names,
            rendered_names,
            baselines,
            temperatures,
            strategy,
            pool,
        })
    }

    pub fn station_count(&self) -> usize {
        self.names.len()
    }

    pub fn station_name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Station name followed by the field separator
    pub fn rendered_name(&self, index: usize) -> &[u8] {
        &self.rendered_names[index]
    }

    pub fn temperatures(&self) -> &TemperatureTable {
        &self.temperatures
    }

    pub fn strategy(&self) -> SamplingStrategy {
        self.strategy
    }

    pub fn pool(&self) -> Option<&SamplePool> {
        self.pool.as_ref()
    }

    /// Per-worker source of sample batches
    pub fn sampler(&self, seed: Option<u64>) -> Sampler<'_> {
        Sampler {
            context: self,
            rng: seeded_rng(seed),
            scratch: Vec::new(),
        }
    }
}

/// Draws batches of sample pairs for one worker.
pub struct Sampler<'a> {
    context: &'a GenerationContext,
    rng: StdRng,
    scratch: Vec<SamplePair>,
}

impl Sampler<'_> {
    /// Up to `n` pairs. Pooled sampling never returns more than the pool size,
    /// so callers must advance by the returned length.
    pub fn next_batch(&mut self, n: usize) -> &[SamplePair] {
        match self.context.pool.as_ref() {
            Some(pool) => pool.draw(n, &mut self.rng),
            None => {
                self.scratch.clear();
                let stations = self.context.station_count();
                for _ in 0..n {
                    let station = self.rng.random_range(0..stations);
                    let celsius = self.context.baselines[station].sample(&mut self.rng);
                    self.scratch.push(SamplePair {
                        station: station as u32,
                        temperature: TemperatureTable::index_of(celsius) as u16,
                    });
                }
                &self.scratch
            }
        }
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StationRecord;
    use crate::utils::constants::TEMP_BUCKETS;

    fn catalog() -> StationCatalog {
        StationCatalog::from_records(vec![
            StationRecord::new("Hamburg", 8.0),
            StationRecord::new("Palermo", 18.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_temperature_table_rendering() {
        let table = TemperatureTable::new();

        assert_eq!(table.len(), TEMP_BUCKETS);
        assert_eq!(table.text(0), b"-200.0\n");
        assert_eq!(table.text(TemperatureTable::index_of(-0.5)), b"-0.5\n");
        assert_eq!(table.text(TemperatureTable::index_of(0.0)), b"0.0\n");
        assert_eq!(table.text(TemperatureTable::index_of(12.34)), b"12.3\n");
        assert_eq!(table.text(TEMP_BUCKETS - 1), b"200.0\n");
        assert_eq!(TemperatureTable::index_of(999.0), TEMP_BUCKETS - 1);
        assert_eq!(TemperatureTable::tenths(TemperatureTable::index_of(-7.3)), -73);
    }

    #[test]
    fn test_context_renders_names_with_separator() -> Result<()> {
        let context = GenerationContext::build(&catalog(), SamplingStrategy::Pooled, 100, Some(1))?;

        assert_eq!(context.station_count(), 2);
        assert_eq!(context.rendered_name(1), b"Palermo;");
        assert_eq!(context.pool().map(SamplePool::len), Some(100));

        Ok(())
    }

    #[test]
    fn test_pooled_batches_are_capped_by_pool() -> Result<()> {
        let context = GenerationContext::build(&catalog(), SamplingStrategy::Pooled, 50, Some(3))?;
        let mut sampler = context.sampler(Some(4));

        assert_eq!(sampler.next_batch(20).len(), 20);
        assert_eq!(sampler.next_batch(80).len(), 50);

        Ok(())
    }

    #[test]
    fn test_independent_sampling_centres_on_baseline() -> Result<()> {
        let context =
            GenerationContext::build(&catalog(), SamplingStrategy::Independent, 0, Some(5))?;
        assert!(context.pool().is_none());

        let mut sampler = context.sampler(Some(6));
        let batch = sampler.next_batch(20_000).to_vec();
        assert_eq!(batch.len(), 20_000);

        let palermo: Vec<f64> = batch
            .iter()
            .filter(|p| p.station == 1)
            .map(|p| TemperatureTable::tenths(p.temperature as usize) as f64 / 10.0)
            .collect();
        let mean = palermo.iter().sum::<f64>() / palermo.len() as f64;
        assert!((mean - 18.0).abs() < 1.0, "mean was {}", mean);

        Ok(())
    }
}
