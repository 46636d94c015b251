//! Benchmarks for BQM construction, linear filters and sampling
//!
//! Run with: cargo bench -p comp-core --bench transform_bench

use comp_core::filters::{self, FilterMethod};
use comp_core::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use std::time::Duration;

fn random_instance(rows: usize, cols: usize, seed: u64) -> (ChannelMatrix, Vec<Complex64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..rows * cols)
        .map(|_| Complex64::new(StandardNormal.sample(&mut rng), StandardNormal.sample(&mut rng)))
        .collect();
    let h = ChannelMatrix::new(rows, cols, data).unwrap();
    let tx: Vec<Complex64> = (0..cols)
        .map(|_| Complex64::new(if rng.gen::<bool>() { 1.0 } else { -1.0 }, 0.0))
        .collect();
    let y = h.mul_vec(&tx).unwrap();
    (h, y)
}

// ============================================================================
// Transformation Benchmarks
// ============================================================================

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    for n in [8usize, 16, 32, 64].iter() {
        let (h, y) = random_instance(*n, n * 3 / 2, 1);
        group.throughput(Throughput::Elements((n * n) as u64));

        for modulation in [Modulation::Bpsk, Modulation::Qam16] {
            let transformer = ChannelToQubo::with_modulation(modulation);
            group.bench_with_input(BenchmarkId::new(modulation.to_string(), n), n, |b, _| {
                b.iter(|| transformer.transform(black_box(&h), black_box(&y)).unwrap())
            });
        }
    }

    group.finish();
}

// ============================================================================
// Linear Filter Benchmarks
// ============================================================================

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters");

    for n in [8usize, 32].iter() {
        let (h, _) = random_instance(n * 2, *n, 2);
        for method in FilterMethod::ALL {
            group.bench_with_input(BenchmarkId::new(method.name(), n), n, |b, _| {
                b.iter(|| filters::linear_filter(black_box(&h), method, 10.0).unwrap())
            });
        }
    }

    group.finish();
}

// ============================================================================
// Sampler Benchmarks
// ============================================================================

fn bench_samplers(c: &mut Criterion) {
    let mut group = c.benchmark_group("samplers");

    let (h, y) = random_instance(10, 14, 3);
    let bqm = ChannelToQubo::default().transform(&h, &y).unwrap();

    group.bench_function("exact_14", |b| {
        b.iter(|| ExactSolver::default().sample(black_box(&bqm)).unwrap())
    });

    let annealer = SimulatedAnnealing { num_reads: 10, num_sweeps: 200, ..Default::default() }.with_seed(7);
    group.bench_function("annealing_14", |b| b.iter(|| annealer.sample(black_box(&bqm)).unwrap()));

    group.finish();
}

criterion_group!(
    name = transform_benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_transform, bench_filters
);

criterion_group!(
    name = sampler_benches;
    config = Criterion::default().sample_size(20);
    targets = bench_samplers
);

criterion_main!(transform_benches, sampler_benches);
