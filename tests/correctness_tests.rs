//! Correctness Tests for the Ghost Cache
//!
//! The ghost cache is checked against a brute-force LRU stack: a plain
//! `Vec` searched linearly on every access. For an unsampled cache the two
//! must agree exactly on every point of the curve.
//!
//! ## Test Strategy
//! - Small sweeps (a handful of buckets) so hand-written traces are readable
//! - Property tests over random traces and random sweeps
//! - Structural checks on sampled curves, whose exact values depend on the hash

use ghost_cache::config::{CapacitySweep, GhostCacheConfig};
use ghost_cache::{CacheStat, CurvePoint, GhostCache, MissRateCurve, MrcEngine};
use proptest::prelude::*;

// ============================================================================
// REFERENCE MODEL
// ============================================================================

/// Exact LRU stack with linear search.
struct ReferenceStack {
    sweep: CapacitySweep,
    stack: Vec<(u8, u64)>,
    // hits[d] counts hits at stack depth d (0 = top)
    hits: Vec<u64>,
    requests: u64,
}

impl ReferenceStack {
    fn new(sweep: CapacitySweep) -> Self {
        Self {
            sweep,
            stack: Vec::new(),
            hits: vec![0; sweep.max()],
            requests: 0,
        }
    }

    fn access(&mut self, key: u8, cost: u64) {
        self.requests += 1;
        if let Some(depth) = self.stack.iter().position(|&(k, _)| k == key) {
            self.hits[depth] += 1;
            self.stack.remove(depth);
        }
        self.stack.insert(0, (key, cost));
        self.stack.truncate(self.sweep.max());
    }

    fn curve(&self) -> MissRateCurve {
        if self.requests == 0 {
            return MissRateCurve::new();
        }
        self.sweep
            .points()
            .map(|capacity| {
                let hits: u64 = self.hits[..capacity].iter().sum();
                let size: u64 = self.stack.iter().take(capacity).map(|&(_, c)| c).sum();
                CurvePoint {
                    count: capacity as u64,
                    size,
                    stat: CacheStat::new(hits, self.requests - hits),
                }
            })
            .collect()
    }
}

fn make_exact(step: usize, min: usize, max: usize) -> GhostCache {
    GhostCache::new(GhostCacheConfig::exact(
        CapacitySweep::new(step, min, max).unwrap(),
    ))
}

fn run_both(
    step: usize,
    min: usize,
    max: usize,
    trace: &[(u8, u64)],
) -> (MissRateCurve, MissRateCurve) {
    let mut ghost = make_exact(step, min, max);
    let mut reference = ReferenceStack::new(CapacitySweep::new(step, min, max).unwrap());
    for &(key, cost) in trace {
        ghost.access(&[key], cost);
        reference.access(key, cost);
    }
    (ghost.snapshot(), reference.curve())
}

// ============================================================================
// HAND-WRITTEN TRACES
// ============================================================================

#[test]
fn test_cyclic_scan_larger_than_cache_never_hits() {
    // A loop over 5 keys defeats every LRU smaller than 5 entries.
    let trace: Vec<(u8, u64)> = (0..50).map(|i| ((i % 5) as u8, 1)).collect();
    let (ghost, reference) = run_both(1, 1, 4, &trace);
    assert_eq!(ghost, reference);
    assert!(ghost.points().iter().all(|p| p.stat.hit_count == 0));
}

#[test]
fn test_cyclic_scan_that_fits_hits_after_warmup() {
    let trace: Vec<(u8, u64)> = (0..40).map(|i| ((i % 4) as u8, 1)).collect();
    let (ghost, reference) = run_both(2, 2, 8, &trace);
    assert_eq!(ghost, reference);

    let hits: Vec<u64> = ghost.points().iter().map(|p| p.stat.hit_count).collect();
    // 2 entries: never; 4 or more entries: all but the 4 cold misses
    assert_eq!(hits, [0, 36, 36, 36]);
}

#[test]
fn test_hot_key_among_cold_keys() {
    let mut trace = Vec::new();
    for i in 0..30u8 {
        trace.push((0, 10));
        trace.push((i + 1, 10));
    }
    let (ghost, reference) = run_both(2, 2, 6, &trace);
    assert_eq!(ghost, reference);
    // the hot key is always at depth 2, so every capacity sees it hit
    assert!(ghost.points().iter().all(|p| p.stat.hit_count == 29));
}

#[test]
fn test_engine_trait_matches_inherent_api() {
    let config = GhostCacheConfig::exact(CapacitySweep::new(1, 1, 3).unwrap());
    let mut via_trait = <GhostCache as MrcEngine>::new(&config);
    let mut direct = GhostCache::new(config);
    for key in [b"x", b"y", b"x", b"z", b"y"] {
        MrcEngine::access(&mut via_trait, key, 7);
        direct.access(key, 7);
    }
    assert_eq!(MrcEngine::snapshot(&via_trait), direct.snapshot());
}

#[test]
fn test_snapshot_does_not_reset() {
    let mut cache = make_exact(1, 1, 2);
    cache.access(b"a", 1);
    cache.access(b"a", 1);
    let first = cache.snapshot();
    assert_eq!(first, cache.snapshot());
    cache.access(b"a", 1);
    assert_eq!(cache.snapshot().points()[0].stat, CacheStat::new(2, 1));
}

#[test]
fn test_curve_lines_use_report_format() {
    let mut cache = make_exact(2, 2, 4);
    cache.access(b"a", 100);
    cache.access(b"a", 100);
    assert_eq!(
        cache.snapshot().lines(),
        ["2 100  50.000% (1/2)", "4 100  50.000% (1/2)"]
    );
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

fn sweep_strategy() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..=4, 1usize..=3, 0usize..=4).prop_map(|(step, min_buckets, extra)| {
        (step, step * min_buckets, step * (min_buckets + extra))
    })
}

fn trace_strategy() -> impl Strategy<Value = Vec<(u8, u64)>> {
    prop::collection::vec((0u8..24, 1u64..1000), 0..400)
}

proptest! {
    #[test]
    fn prop_exact_cache_matches_reference(
        (step, min, max) in sweep_strategy(),
        trace in trace_strategy(),
    ) {
        let (ghost, reference) = run_both(step, min, max, &trace);
        prop_assert_eq!(ghost, reference);
    }

    #[test]
    fn prop_sampled_curves_are_monotone(
        shift in 0u32..=3,
        keys in prop::collection::vec(any::<u32>(), 1..600),
    ) {
        let sweep = CapacitySweep::new(8, 8, 64).unwrap();
        let mut cache = GhostCache::new(GhostCacheConfig::new(sweep, shift).unwrap());
        for key in &keys {
            cache.access(&(key % 97).to_le_bytes(), 64);
        }
        let curve = cache.snapshot();
        let metrics = cache.ghost_metrics();
        prop_assert_eq!(metrics.requests, keys.len() as u64);

        if metrics.sampled_requests == 0 {
            prop_assert!(curve.is_empty());
        } else {
            prop_assert!(curve.is_well_formed());
            prop_assert_eq!(curve.len(), sweep.len());
            let mut previous_hits = 0;
            for (point, capacity) in curve.points().iter().zip(sweep.points()) {
                prop_assert_eq!(point.count, capacity as u64);
                prop_assert!(point.stat.hit_count >= previous_hits);
                prop_assert_eq!(point.stat.total(), metrics.sampled_requests);
                prop_assert_eq!(point.size % (64 << shift), 0);
                previous_hits = point.stat.hit_count;
            }
        }
    }
}
