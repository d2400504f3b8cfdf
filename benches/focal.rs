//! Benchmarks for focal-point position math.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use theme_runtime::widgets::focal_point::{PositionCache, calculate_position};

fn bench_calculate_position(c: &mut Criterion) {
    c.bench_function("calculate_position", |b| {
        b.iter(|| calculate_position(black_box(0.37), black_box(-0.82)))
    });
}

fn bench_cached_grid(c: &mut Criterion) {
    let points: Vec<(f64, f64)> = (0..20)
        .flat_map(|i| (0..20).map(move |j| (f64::from(i) / 10.0 - 1.0, f64::from(j) / 10.0 - 1.0)))
        .collect();
    c.bench_function("cached_grid_400", |b| {
        b.iter(|| {
            let mut cache = PositionCache::default();
            for _ in 0..3 {
                for &(x, y) in &points {
                    black_box(cache.position(x, y));
                }
            }
            cache.len()
        })
    });
}

criterion_group!(benches, bench_calculate_position, bench_cached_grid);
criterion_main!(benches);
