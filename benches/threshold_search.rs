//! Threshold search benchmark over ensembles of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hydroglue::threshold::{search, SearchParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn bench_threshold_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("threshold_search");
    for &n in &[1_000usize, 10_000, 100_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let objective: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &objective, |b, col| {
            b.iter(|| search(black_box(col), &SearchParams::default()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_threshold_search);
criterion_main!(benches);
