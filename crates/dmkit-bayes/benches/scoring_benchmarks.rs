//! Structure scoring benchmarks
//!
//! ## Hot Paths Identified
//! 1. local_score() - called once per candidate parent in every K2 step
//! 2. k2() - one full greedy pass over all nodes
//!
//! ## Performance Targets
//! - local_score with one parent over 1000 rows: < 100µs
//! - K2 pass over 8 variables x 1000 rows: < 50ms

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dmkit_bayes::search::k2;
use dmkit_bayes::{local_score, Dag, EdgeChange};
use dmkit_core::ObservationTable;

fn random_table(vars: usize, rows: usize, arity: u32) -> ObservationTable {
    let mut rng = StdRng::seed_from_u64(1234);
    let names = (0..vars).map(|i| format!("v{i}")).collect();
    let columns = (0..vars)
        .map(|_| (0..rows).map(|_| rng.gen_range(1..=arity)).collect())
        .collect();
    ObservationTable::from_columns(names, columns).unwrap()
}

fn bench_local_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_score");

    for rows in [100, 1000, 10_000] {
        let data = random_table(4, rows, 4);
        let dag = Dag::from_table(&data)
            .apply(EdgeChange::Add { parent: 1, child: 0 })
            .unwrap()
            .apply(EdgeChange::Add { parent: 2, child: 0 })
            .unwrap();

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("two_parents", rows), &rows, |b, _| {
            b.iter(|| local_score(black_box(&dag), 0, black_box(&data)));
        });
    }

    group.finish();
}

fn bench_k2_pass(c: &mut Criterion) {
    let data = random_table(8, 1000, 3);
    let dag = Dag::from_table(&data);

    c.bench_function("k2_pass_8x1000", |b| {
        b.iter(|| k2(black_box(&dag), black_box(&data), 1));
    });
}

criterion_group!(benches, bench_local_score, bench_k2_pass);
criterion_main!(benches);
