//! Ghost Cache Configuration
//!
//! A ghost cache reports statistics for a fixed *capacity sweep*: the candidate
//! cache sizes `min, min + step, min + 2·step, …, max`, measured in entries.
//! The sweep is shared by every ghost cache created for a run, so it is
//! validated once, up front, and then copied freely.
//!
//! # Sampling
//!
//! [`GhostCacheConfig::sample_shift`] enables spatial sampling: with a shift of
//! `s`, only keys whose hash has its low `s` bits clear are simulated, and the
//! sweep is scaled down by `2^s` internally. Reported capacities are scaled
//! back up, so callers always see the sweep they asked for.
//!
//! # Examples
//!
//! ```
//! use ghost_cache::config::{CapacitySweep, GhostCacheConfig};
//!
//! let sweep = CapacitySweep::new(64, 64, 1024).unwrap();
//! assert_eq!(sweep.len(), 16);
//!
//! let config = GhostCacheConfig::new(sweep, 1).unwrap();
//! assert_eq!(config.sampled_sweep().step(), 32);
//! ```

use core::fmt;
use thiserror::Error;

/// Largest supported sampling shift (one key in 65536).
pub const MAX_SAMPLE_SHIFT: u32 = 16;

/// Errors raised while validating a capacity sweep or ghost cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The sweep step was zero.
    #[error("capacity step must be greater than zero")]
    ZeroStep,

    /// The smallest capacity was zero.
    #[error("minimum capacity must be greater than zero")]
    ZeroMin,

    /// The sweep bounds were inverted.
    #[error("minimum capacity {min} exceeds maximum capacity {max}")]
    MinAboveMax {
        /// Requested minimum capacity
        min: usize,
        /// Requested maximum capacity
        max: usize,
    },

    /// A sweep bound was not a multiple of the step.
    #[error("{bound} capacity {value} is not a multiple of the step {step}")]
    Misaligned {
        /// Which bound was misaligned ("minimum" or "maximum")
        bound: &'static str,
        /// The offending value
        value: usize,
        /// The sweep step
        step: usize,
    },

    /// The sampling shift was larger than [`MAX_SAMPLE_SHIFT`].
    #[error("sample shift {0} exceeds the maximum of 16")]
    SampleShiftTooLarge(u32),

    /// The step cannot be divided evenly among sampled keys.
    #[error("capacity step {step} is not a multiple of the sampling rate 2^{shift}")]
    StepBelowSampling {
        /// The sweep step
        step: usize,
        /// The sampling shift
        shift: u32,
    },
}

/// A validated capacity sweep `min, min + step, …, max`, in entries.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CapacitySweep {
    step: usize,
    min: usize,
    max: usize,
}

impl CapacitySweep {
    /// Validates and creates a sweep.
    ///
    /// Both bounds must be positive multiples of `step`, and `min <= max`.
    pub fn new(step: usize, min: usize, max: usize) -> Result<Self, ConfigError> {
        if step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if min == 0 {
            return Err(ConfigError::ZeroMin);
        }
        if min > max {
            return Err(ConfigError::MinAboveMax { min, max });
        }
        if min % step != 0 {
            return Err(ConfigError::Misaligned {
                bound: "minimum",
                value: min,
                step,
            });
        }
        if max % step != 0 {
            return Err(ConfigError::Misaligned {
                bound: "maximum",
                value: max,
                step,
            });
        }
        Ok(Self { step, min, max })
    }

    /// Distance between two consecutive capacities.
    #[inline]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Smallest capacity reported.
    #[inline]
    pub fn min(&self) -> usize {
        self.min
    }

    /// Largest capacity reported; also the depth of the simulated recency stack.
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }

    /// Number of capacities in the sweep.
    #[inline]
    pub fn len(&self) -> usize {
        (self.max - self.min) / self.step + 1
    }

    /// Always false: a valid sweep has at least one capacity.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of `step`-wide buckets needed to cover the stack up to `max`.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.max / self.step
    }

    /// Iterates over every capacity of the sweep in increasing order.
    pub fn points(&self) -> impl Iterator<Item = usize> {
        (self.min..=self.max).step_by(self.step)
    }

    fn scaled_down(&self, shift: u32) -> Self {
        Self {
            step: self.step >> shift,
            min: self.min >> shift,
            max: self.max >> shift,
        }
    }
}

impl fmt::Debug for CapacitySweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapacitySweep")
            .field("step", &self.step)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl Default for CapacitySweep {
    /// Sixteen points from 64 to 1024 entries.
    fn default() -> Self {
        Self {
            step: 64,
            min: 64,
            max: 1024,
        }
    }
}

/// Configuration for a [`GhostCache`](crate::GhostCache).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GhostCacheConfig {
    sweep: CapacitySweep,
    sample_shift: u32,
}

impl GhostCacheConfig {
    /// Creates a configuration, checking that the sweep survives sampling.
    pub fn new(sweep: CapacitySweep, sample_shift: u32) -> Result<Self, ConfigError> {
        if sample_shift > MAX_SAMPLE_SHIFT {
            return Err(ConfigError::SampleShiftTooLarge(sample_shift));
        }
        if sweep.step % (1usize << sample_shift) != 0 {
            return Err(ConfigError::StepBelowSampling {
                step: sweep.step,
                shift: sample_shift,
            });
        }
        Ok(Self {
            sweep,
            sample_shift,
        })
    }

    /// Creates an unsampled configuration: every key is simulated.
    pub fn exact(sweep: CapacitySweep) -> Self {
        Self {
            sweep,
            sample_shift: 0,
        }
    }

    /// The sweep as seen by callers.
    #[inline]
    pub fn sweep(&self) -> CapacitySweep {
        self.sweep
    }

    /// Keys are sampled at a rate of `1 / 2^sample_shift`.
    #[inline]
    pub fn sample_shift(&self) -> u32 {
        self.sample_shift
    }

    /// The sweep in sampled-key units, as simulated internally.
    pub fn sampled_sweep(&self) -> CapacitySweep {
        self.sweep.scaled_down(self.sample_shift)
    }
}

impl fmt::Debug for GhostCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhostCacheConfig")
            .field("sweep", &self.sweep)
            .field("sample_shift", &self.sample_shift)
            .finish()
    }
}

impl Default for GhostCacheConfig {
    /// The default sweep, sampling one key in two.
    fn default() -> Self {
        Self {
            sweep: CapacitySweep::default(),
            sample_shift: 1,
        }
    }
}
