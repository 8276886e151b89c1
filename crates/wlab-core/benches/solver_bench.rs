//! Water-filling solver benchmarks
//!
//! Run with: cargo bench -p wlab-core --bench solver_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wlab_core::waterfilling::{exact_water_level, BracketStrategy, WaterFilling};

fn floors(n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(1);
    (0..n).map(|_| rng.gen_range(0.05..5.0)).collect()
}

fn bench_bisection(c: &mut Criterion) {
    let mut group = c.benchmark_group("bisection");

    for n in [4usize, 16, 64, 256, 1024].iter() {
        let inv_snr = floors(*n);
        let solver = WaterFilling::new(*n as f64);

        group.throughput(Throughput::Elements(*n as u64));
        group.bench_with_input(BenchmarkId::new("analytic", n), n, |b, _| {
            b.iter(|| solver.solve(black_box(&inv_snr)))
        });
        group.bench_with_input(BenchmarkId::new("traced", n), n, |b, _| {
            b.iter(|| solver.solve_traced(black_box(&inv_snr)))
        });
    }

    group.finish();
}

fn bench_bracket_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("bracket");
    // Small budget keeps the water level inside the SNR range
    let inv_snr = floors(64);

    for strategy in [BracketStrategy::Analytic, BracketStrategy::SnrRange] {
        let solver = WaterFilling::new(0.5).with_bracket(strategy);
        group.bench_function(strategy.to_string(), |b| {
            b.iter(|| solver.solve(black_box(&inv_snr)))
        });
    }

    group.finish();
}

fn bench_exact(c: &mut Criterion) {
    let mut group = c.benchmark_group("exact_water_level");

    for n in [4usize, 64, 1024].iter() {
        let inv_snr = floors(*n);
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| exact_water_level(black_box(&inv_snr), *n as f64))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bisection, bench_bracket_strategies, bench_exact);
criterion_main!(benches);
