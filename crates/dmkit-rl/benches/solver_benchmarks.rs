//! Policy solver benchmarks
//!
//! ## Hot Paths Identified
//! 1. GridWorld::sweep() - one synchronous Bellman backup over the grid
//! 2. QLearning::update() - called once per logged transition
//! 3. TransitionKernel::expected_value() - inner product of every car sweep
//!
//! ## Performance Targets
//! - 10x10 grid sweep: < 50µs
//! - Q update: < 100ns per sample

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dmkit_core::TransitionSample;
use dmkit_rl::{GridConfig, GridWorld, QLearning, QLearningConfig, TargetRule, TransitionKernel};

fn bench_grid_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_sweep");

    for size in [10, 50, 100] {
        let mut rng = StdRng::seed_from_u64(7);
        let rewards = Array2::from_shape_fn((size, size), |_| rng.gen_range(-1.0..1.0));
        let config = GridConfig {
            size,
            ..GridConfig::default()
        };
        let mut grid = GridWorld::new(rewards, config).unwrap();

        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| grid.sweep());
        });
    }

    group.finish();
}

fn bench_q_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("q_update");
    let mut rng = StdRng::seed_from_u64(11);
    let samples: Vec<TransitionSample> = (0..1000)
        .map(|_| {
            TransitionSample::new(
                rng.gen_range(1..=10_000),
                rng.gen_range(1..=125),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(1..=10_000),
            )
        })
        .collect();

    for (label, target) in [("same_action", TargetRule::SameAction), ("max_next", TargetRule::MaxNext)] {
        let mut learner = QLearning::new(QLearningConfig {
            num_states: 10_000,
            target,
            ..QLearningConfig::default()
        });
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_function(label, |b| {
            b.iter(|| learner.train(black_box(&samples)).unwrap());
        });
    }

    group.finish();
}

fn bench_kernel_product(c: &mut Criterion) {
    let states = 50_000;
    let mut rng = StdRng::seed_from_u64(3);
    let mut kernel = TransitionKernel::new(states);
    for s in 0..states {
        for _ in 0..4 {
            kernel.add(s, rng.gen_range(0..states), 0.25);
        }
    }
    let values = Array1::from_shape_fn(states, |i| i as f64);

    c.bench_function("kernel_expected_value", |b| {
        b.iter(|| kernel.expected_value(black_box(&values)));
    });
}

criterion_group!(
    name = solver_benchmarks;
    config = Criterion::default();
    targets =
        bench_grid_sweep,
        bench_q_update,
        bench_kernel_product,
);

criterion_main!(solver_benchmarks);
