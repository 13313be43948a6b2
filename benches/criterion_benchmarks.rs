use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ghost_cache::config::{CapacitySweep, GhostCacheConfig};
use ghost_cache::GhostCache;

fn make_ghost(step: usize, max: usize, shift: u32) -> GhostCache {
    let sweep = CapacitySweep::new(step, step, max).unwrap();
    GhostCache::new(GhostCacheConfig::new(sweep, shift).unwrap())
}

fn keys(count: u32) -> Vec<[u8; 4]> {
    (0..count).map(|i| i.to_le_bytes()).collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    const MAX: usize = 16_384;
    let mut group = c.benchmark_group("Ghost Cache Operations");

    // Hits: the working set fits in the stack
    {
        let mut cache = make_ghost(64, MAX, 0);
        let keys = keys(4096);
        for key in &keys {
            cache.access(key, 100);
        }

        group.bench_function("access hit", |b| {
            b.iter(|| {
                for key in keys.iter().take(100) {
                    cache.access(black_box(key), 100);
                }
            });
        });
    }

    // Misses: every access inserts and cascades through all buckets
    {
        let mut cache = make_ghost(64, MAX, 0);
        let mut next = 0u32;

        group.bench_function("access miss", |b| {
            b.iter(|| {
                for _ in 0..100 {
                    next = next.wrapping_add(1);
                    cache.access(black_box(&next.to_le_bytes()), 100);
                }
            });
        });
    }

    // Step width controls the number of buckets an access may walk
    for step in [16usize, 64, 256] {
        let mut cache = make_ghost(step, MAX, 0);
        let keys = keys(MAX as u32 * 2);
        for key in &keys {
            cache.access(key, 100);
        }

        group.bench_with_input(BenchmarkId::new("access scan", step), &step, |b, _| {
            let mut i = 0usize;
            b.iter(|| {
                for _ in 0..100 {
                    i = (i + 1) % keys.len();
                    cache.access(black_box(&keys[i]), 100);
                }
            });
        });
    }

    // Sampling skips most keys before touching the stack
    for shift in [0u32, 2, 4] {
        let mut cache = make_ghost(64, MAX, shift);
        let keys = keys(MAX as u32);

        group.bench_with_input(BenchmarkId::new("sampled access", shift), &shift, |b, _| {
            let mut i = 0usize;
            b.iter(|| {
                for _ in 0..100 {
                    i = (i + 1) % keys.len();
                    cache.access(black_box(&keys[i]), 100);
                }
            });
        });
    }

    {
        let mut cache = make_ghost(64, MAX, 0);
        for key in &keys(MAX as u32) {
            cache.access(key, 100);
        }

        group.bench_function("snapshot", |b| {
            b.iter(|| black_box(cache.snapshot()));
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
