//! Ghost LRU Cache
//!
//! A ghost cache tracks keys and sizes but no values. Instead of answering
//! "is this key cached?", it answers "how far down the LRU recency stack was
//! this key?", which is enough to tell, for every capacity at once, whether
//! an LRU cache of that capacity would have hit.
//!
//! # Algorithm
//!
//! The recency stack, `max` entries deep, is cut into `max / step` buckets of
//! `step` entries each. Bucket 0 holds the `step` most recently used keys,
//! bucket 1 the next `step`, and so on. Every entry remembers the bucket it
//! lives in, so a lookup finds the stack distance of a key to within one
//! bucket in O(1):
//!
//! ```text
//!   top of stack                                         bottom (max)
//!   ┌──────────┐   ┌──────────┐   ┌──────────┐       ┌──────────┐
//!   │ bucket 0 │──▶│ bucket 1 │──▶│ bucket 2 │  ...  │ bucket n │──▶ forgotten
//!   │  hits[0] │   │  hits[1] │   │  hits[2] │       │  hits[n] │
//!   └──────────┘   └──────────┘   └──────────┘       └──────────┘
//! ```
//!
//! A hit in bucket `b` counts towards every capacity of at least
//! `(b + 1) * step` entries. The entry moves to the front of bucket 0 and each
//! bucket in between hands its least recent entry to the next one. A miss is
//! inserted the same way, and whatever falls off the last bucket is forgotten.
//!
//! # Sampling
//!
//! With a sample shift of `s` only keys whose hash has the low `s` bits clear
//! are simulated, against a stack `2^s` times shallower. Capacities and byte
//! counts are scaled back up when a curve is taken; hit and miss counts are
//! reported as observed on the sampled keys.
//!
//! # Performance Characteristics
//!
//! - **Access**: O(max / step)
//! - **Snapshot**: O(max / step)
//! - **Memory**: O(max / 2^s) entries of roughly 40 bytes plus the index

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::hash::BuildHasher;
use core::num::NonZeroUsize;
use core::ptr::NonNull;

use ahash::RandomState;
use hashbrown::HashMap;

use crate::config::{CapacitySweep, GhostCacheConfig};
use crate::curve::{CurvePoint, MissRateCurve};
use crate::engine::MrcEngine;
use crate::list::{Entry, List};
use crate::metrics::{CacheMetrics, CacheStat, GhostCacheMetrics};

// Fixed seeds keep sampling decisions identical from one run to the next.
const SAMPLING_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// A key tracked by the recency stack.
#[derive(Debug, Clone, Copy)]
struct GhostEntry {
    key_hash: u64,
    size: u64,
    bucket: usize,
}

/// The bucketed recency stack, in sampled units.
///
/// # Safety
///
/// Every pointer in `index` refers to a node linked into exactly one bucket,
/// namely `buckets[entry.bucket]`. A node leaves the index in the same step
/// that frees it.
pub(crate) struct GhostSegment {
    buckets: Vec<List<GhostEntry>>,
    index: HashMap<u64, NonNull<Entry<GhostEntry>>>,
    bucket_hits: Vec<u64>,
    // Wide enough that a full stack of u64::MAX costs cannot overflow
    bucket_bytes: Vec<u128>,
    requests: u64,
    evictions: u64,
}

// SAFETY: GhostSegment owns every node its pointers refer to.
unsafe impl Send for GhostSegment {}

// SAFETY: All mutation requires &mut self; shared references cannot cause data races.
unsafe impl Sync for GhostSegment {}

impl GhostSegment {
    pub(crate) fn new(sweep: CapacitySweep) -> Self {
        let bucket_count = sweep.bucket_count();
        // A valid sweep always has a positive step.
        let step = NonZeroUsize::new(sweep.step()).unwrap_or(NonZeroUsize::MIN);
        GhostSegment {
            buckets: (0..bucket_count).map(|_| List::new(step)).collect(),
            index: HashMap::with_capacity(sweep.max()),
            bucket_hits: vec![0; bucket_count],
            bucket_bytes: vec![0; bucket_count],
            requests: 0,
            evictions: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub(crate) fn requests(&self) -> u64 {
        self.requests
    }

    #[inline]
    pub(crate) fn evictions(&self) -> u64 {
        self.evictions
    }

    pub(crate) fn stack_hits(&self) -> u64 {
        self.bucket_hits.iter().sum()
    }

    /// Records an access to `key_hash` costing `size` bytes.
    pub(crate) fn access(&mut self, key_hash: u64, size: u64) {
        self.requests += 1;

        match self.index.get(&key_hash).copied() {
            Some(node) => {
                // SAFETY: pointers in the index refer to live, linked nodes
                let bucket = unsafe { (*node.as_ptr()).get_value().bucket };
                self.bucket_hits[bucket] += 1;

                // SAFETY: node is linked into buckets[bucket] and is relinked
                // into bucket 0 straight away
                unsafe {
                    self.buckets[bucket].unlink(node);
                    let entry = (*node.as_ptr()).get_value_mut();
                    self.bucket_bytes[bucket] -= u128::from(entry.size);
                    entry.size = size;
                    entry.bucket = 0;
                    self.buckets[0].link_front(node);
                }
                self.bucket_bytes[0] += u128::from(size);
                self.cascade(bucket);
            }
            None => {
                let node = self.buckets[0].push_front(GhostEntry {
                    key_hash,
                    size,
                    bucket: 0,
                });
                self.index.insert(key_hash, node);
                self.bucket_bytes[0] += u128::from(size);
                self.cascade(self.buckets.len());
            }
        }
    }

    /// Pushes overflow down the stack, bucket by bucket, stopping at `until`
    /// or at the first bucket with room. Overflow from the last bucket is
    /// forgotten.
    fn cascade(&mut self, until: usize) {
        let last = self.buckets.len() - 1;
        for i in 0..until.min(self.buckets.len()) {
            if !self.buckets[i].is_over_capacity() {
                break;
            }
            let Some(node) = self.buckets[i].pop_back() else {
                break;
            };
            // SAFETY: node was just detached from buckets[i]
            let size = u128::from(unsafe { (*node.as_ptr()).get_value().size });
            self.bucket_bytes[i] -= size;

            if i == last {
                // SAFETY: node is detached and only the index still names it;
                // that entry is dropped right below
                let entry = unsafe { List::free(node) };
                self.index.remove(&entry.key_hash);
                self.evictions += 1;
            } else {
                // SAFETY: node is detached and moves to the next bucket
                unsafe {
                    (*node.as_ptr()).get_value_mut().bucket = i + 1;
                    self.buckets[i + 1].link_front(node);
                }
                self.bucket_bytes[i + 1] += size;
            }
        }
    }

    /// Accumulates the buckets into a curve over `reported`, with byte counts
    /// multiplied by `2^shift`. Byte counts past `u64::MAX` saturate.
    pub(crate) fn curve(
        &self,
        sampled: CapacitySweep,
        reported: CapacitySweep,
        shift: u32,
    ) -> MissRateCurve {
        let mut curve = MissRateCurve::new();
        if self.requests == 0 {
            return curve;
        }

        let mut hits = 0u64;
        let mut bytes = 0u128;
        for (k, (bucket_hits, bucket_bytes)) in
            self.bucket_hits.iter().zip(&self.bucket_bytes).enumerate()
        {
            hits += bucket_hits;
            bytes += bucket_bytes;
            let capacity = k + 1;
            if capacity * sampled.step() < sampled.min() {
                continue;
            }
            curve.push(CurvePoint {
                count: (capacity * reported.step()) as u64,
                size: u64::try_from(bytes.saturating_mul(1u128 << shift)).unwrap_or(u64::MAX),
                stat: CacheStat::new(hits, self.requests - hits),
            });
        }
        curve
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.bucket_hits.iter_mut().for_each(|h| *h = 0);
        self.bucket_bytes.iter_mut().for_each(|b| *b = 0);
        self.requests = 0;
        self.evictions = 0;
    }
}

impl fmt::Debug for GhostSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhostSegment")
            .field("buckets", &self.buckets.len())
            .field("resident", &self.index.len())
            .field("requests", &self.requests)
            .finish()
    }
}

/// A sampled ghost LRU cache producing miss-rate curves.
///
/// # Examples
///
/// ```
/// use ghost_cache::GhostCache;
/// use ghost_cache::config::{CapacitySweep, GhostCacheConfig};
///
/// let sweep = CapacitySweep::new(1, 1, 4).unwrap();
/// let mut cache = GhostCache::new(GhostCacheConfig::exact(sweep));
///
/// cache.access(b"a", 10);
/// cache.access(b"b", 10);
/// cache.access(b"a", 10); // stack distance 2
///
/// let curve = cache.snapshot();
/// assert_eq!(curve.points()[0].stat.hit_count, 0); // 1 entry: miss
/// assert_eq!(curve.points()[1].stat.hit_count, 1); // 2 entries: hit
/// ```
pub struct GhostCache {
    config: GhostCacheConfig,
    hasher: RandomState,
    segment: GhostSegment,
    requests: u64,
}

impl GhostCache {
    /// Creates an empty ghost cache.
    pub fn new(config: GhostCacheConfig) -> Self {
        GhostCache {
            config,
            hasher: RandomState::with_seeds(
                SAMPLING_SEEDS[0],
                SAMPLING_SEEDS[1],
                SAMPLING_SEEDS[2],
                SAMPLING_SEEDS[3],
            ),
            segment: GhostSegment::new(config.sampled_sweep()),
            requests: 0,
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &GhostCacheConfig {
        &self.config
    }

    /// Number of sampled keys currently on the recency stack.
    pub fn len(&self) -> usize {
        self.segment.len()
    }

    /// Returns true if no sampled key is on the stack.
    pub fn is_empty(&self) -> bool {
        self.segment.len() == 0
    }

    /// Records an access to `key` costing `cost` bytes.
    ///
    /// Keys outside the sample are counted as offered and otherwise ignored.
    pub fn access(&mut self, key: &[u8], cost: u64) {
        self.requests += 1;
        let hash = self.hasher.hash_one(key);
        let mask = (1u64 << self.config.sample_shift()) - 1;
        if hash & mask == 0 {
            self.segment.access(hash, cost);
        }
    }

    /// The miss-rate curve over everything accessed so far.
    ///
    /// Empty when no access has passed the sampling filter.
    pub fn snapshot(&self) -> MissRateCurve {
        self.segment.curve(
            self.config.sampled_sweep(),
            self.config.sweep(),
            self.config.sample_shift(),
        )
    }

    /// Counters describing the simulation so far.
    pub fn ghost_metrics(&self) -> GhostCacheMetrics {
        GhostCacheMetrics {
            requests: self.requests,
            sampled_requests: self.segment.requests(),
            stack_hits: self.segment.stack_hits(),
            evictions: self.segment.evictions(),
            resident_entries: self.segment.len() as u64,
        }
    }

    /// Forgets every key and resets all counters.
    pub fn clear(&mut self) {
        self.segment.clear();
        self.requests = 0;
    }
}

impl MrcEngine for GhostCache {
    type Config = GhostCacheConfig;

    fn new(config: &Self::Config) -> Self {
        GhostCache::new(*config)
    }

    fn access(&mut self, key: &[u8], cost: u64) {
        GhostCache::access(self, key, cost);
    }

    fn snapshot(&self) -> MissRateCurve {
        GhostCache::snapshot(self)
    }
}

impl CacheMetrics for GhostCache {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.ghost_metrics().to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "GHOST-LRU"
    }
}

impl fmt::Debug for GhostCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhostCache")
            .field("config", &self.config)
            .field("requests", &self.requests)
            .field("segment", &self.segment)
            .finish()
    }
}
