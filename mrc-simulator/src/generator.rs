//! Synthetic trace generation
//!
//! Produces a multi-tenant trace in the twitter layout
//! (`ts,key,key_size,value_size,client,op,ttl`, no header). Each tenant owns
//! its own key space whose popularity follows a Zipf distribution, so the
//! resulting curves have a recognizable knee. Output depends only on the
//! configuration: the same seed always writes the same bytes.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroU64;
use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::SimError;

/// Parameters for a synthetic trace
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Tenants, numbered from 1
    pub tenants: NonZeroU64,
    /// Distinct keys per tenant
    pub keys: usize,
    /// Records to write
    pub requests: u64,
    /// Records per unit of trace time
    pub rate: NonZeroU64,
    /// Zipf exponent; 0 is uniform
    pub skew: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tenants: NonZeroU64::MIN.saturating_add(3),
            keys: 1000,
            requests: 100_000,
            rate: NonZeroU64::MIN.saturating_add(99),
            skew: 0.9,
            seed: 42,
        }
    }
}

/// Writes synthetic traces for a fixed configuration
#[derive(Debug)]
pub struct TraceGenerator {
    config: GeneratorConfig,
    popularity: WeightedIndex<f64>,
}

impl TraceGenerator {
    /// Fails if the key count or skew leave no usable distribution.
    pub fn new(config: GeneratorConfig) -> Result<Self, SimError> {
        let weights = (1..=config.keys).map(|rank| 1.0 / (rank as f64).powf(config.skew));
        let popularity = WeightedIndex::new(weights)?;
        Ok(Self { config, popularity })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Writes the whole trace to `writer` and returns the number of records.
    pub fn write<W: Write>(&self, writer: W) -> io::Result<u64> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        // Value sizes are fixed per key rank so repeated keys keep their cost
        let value_sizes: Vec<u64> = (0..self.config.keys)
            .map(|_| rng.gen_range(16..=4096))
            .collect();

        let mut out = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        for i in 0..self.config.requests {
            let ts = i / self.config.rate.get();
            let tenant = rng.gen_range(1..=self.config.tenants.get());
            let rank = self.popularity.sample(&mut rng);
            let key = format!("t{tenant}:k{rank}");

            let key_size = key.len();
            out.write_record(&[
                ts.to_string(),
                key,
                key_size.to_string(),
                value_sizes[rank].to_string(),
                tenant.to_string(),
                "get".to_string(),
                "0".to_string(),
            ])?;
        }

        out.flush()?;
        Ok(self.config.requests)
    }

    /// Writes the trace to `path`, replacing any existing file.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<u64, SimError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| SimError::io(path, e))?;
        let written = self
            .write(BufWriter::new(file))
            .map_err(|e| SimError::io(path, e))?;
        info!(
            path = %path.display(),
            records = written,
            tenants = self.config.tenants.get(),
            "generated trace"
        );
        Ok(written)
    }
}
