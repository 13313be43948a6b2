//! Ghost Cache Metrics
//!
//! Two kinds of numbers come out of a ghost cache:
//!
//! - [`CacheStat`]: the hit/miss split for one candidate capacity. A miss-rate
//!   curve is a list of these, one per sweep point.
//! - [`GhostCacheMetrics`]: bookkeeping about the simulation itself (requests
//!   offered, requests sampled, evictions from the stack), reported through
//!   the [`CacheMetrics`] trait.
//!
//! Metrics are reported as a `BTreeMap` so that keys always come out in the
//! same order; simulation output has to be reproducible run over run.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

use crate::curve::ParseCurveError;

/// Hit/miss counts observed at one candidate capacity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStat {
    /// Requests that would have hit a cache of this capacity
    pub hit_count: u64,
    /// Requests that would have missed
    pub miss_count: u64,
}

impl CacheStat {
    /// Creates a stat from raw counts.
    pub fn new(hit_count: u64, miss_count: u64) -> Self {
        Self {
            hit_count,
            miss_count,
        }
    }

    /// Total number of requests accounted for.
    #[inline]
    pub fn total(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    /// Fraction of requests that hit, between 0.0 and 1.0 (0.0 when empty).
    pub fn hit_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.hit_count as f64 / total as f64,
        }
    }

    /// Fraction of requests that missed, between 0.0 and 1.0 (0.0 when empty).
    pub fn miss_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.miss_count as f64 / total as f64,
        }
    }
}

impl fmt::Display for CacheStat {
    /// Formats as `"  50.000% (1/2)"`. The percentage is right-aligned in
    /// eight columns, so the output always starts with whitespace.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>8.3}% ({}/{})",
            self.hit_rate() * 100.0,
            self.hit_count,
            self.total()
        )
    }
}

impl FromStr for CacheStat {
    type Err = ParseCurveError;

    /// Parses the [`Display`](fmt::Display) form. Only the counts are read
    /// back; the percentage is derived from them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, counts) = s
            .trim()
            .split_once('%')
            .ok_or(ParseCurveError::MalformedStat)?;
        let counts = counts
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or(ParseCurveError::MalformedStat)?;
        let (hits, total) = counts
            .split_once('/')
            .ok_or(ParseCurveError::MalformedStat)?;
        let hit_count: u64 = hits
            .trim()
            .parse()
            .map_err(|_| ParseCurveError::InvalidNumber("hit count"))?;
        let total: u64 = total
            .trim()
            .parse()
            .map_err(|_| ParseCurveError::InvalidNumber("total count"))?;
        if hit_count > total {
            return Err(ParseCurveError::MalformedStat);
        }
        Ok(Self::new(hit_count, total - hit_count))
    }
}

/// Bookkeeping counters maintained by a ghost cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GhostCacheMetrics {
    /// Accesses offered to the cache, sampled or not
    pub requests: u64,
    /// Accesses that passed the sampling filter and were simulated
    pub sampled_requests: u64,
    /// Simulated accesses found anywhere in the recency stack
    pub stack_hits: u64,
    /// Entries pushed out of the bottom of the stack
    pub evictions: u64,
    /// Entries currently held in the stack
    pub resident_entries: u64,
}

impl GhostCacheMetrics {
    /// Fraction of offered requests that were simulated.
    pub fn sampling_ratio(&self) -> f64 {
        if self.requests > 0 {
            self.sampled_requests as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a map with a stable key order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("resident_entries".to_string(), self.resident_entries as f64);
        metrics.insert("sampled_requests".to_string(), self.sampled_requests as f64);
        metrics.insert("sampling_ratio".to_string(), self.sampling_ratio());
        metrics.insert("stack_hits".to_string(), self.stack_hits as f64);
        metrics
    }
}

/// Uniform metrics reporting for simulation backends.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short name identifying the backend (e.g. "GHOST-LRU").
    fn algorithm_name(&self) -> &'static str;
}
