//! Benchmarks for GSO updates and LLL reduction across backends

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use lattice_gso::dispatch::reduce;
use lattice_gso::utils::{ntrulike, uniform};
use lattice_gso::{lll_reduction, GsoEngine, LLLParams, Method, NumericBackend, ReductionFlags};

fn bench_lll_backends(c: &mut Criterion) {
    let mut group = c.benchmark_group("LLL by backend");
    group.sample_size(10);

    let backends = [
        NumericBackend::Native,
        NumericBackend::Extended,
        NumericBackend::DoubleDouble,
        NumericBackend::QuadDouble,
        NumericBackend::Arbitrary { bits: 128 },
    ];
    let basis = uniform(20, 30, 42).unwrap();
    for backend in backends {
        group.bench_with_input(BenchmarkId::new("uniform-20", backend), &backend, |b, &backend| {
            b.iter_batched(
                || basis.clone(),
                |mut basis| black_box(reduce(&mut basis, backend, &LLLParams::default()).unwrap()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_lll_dimensions(c: &mut Criterion) {
    let mut group = c.benchmark_group("LLL NTRU-like");
    group.sample_size(10);

    for d in [10, 20, 30].iter() {
        let basis = ntrulike(*d, 30, 7).unwrap();
        group.bench_with_input(BenchmarkId::new("wrapper", 2 * d), &basis, |b, basis| {
            b.iter_batched(
                || basis.clone(),
                |mut basis| {
                    black_box(
                        lll_reduction(&mut basis, &LLLParams::default(), Method::Wrapper, None, None)
                            .unwrap(),
                    )
                },
                BatchSize::SmallInput,
            );
        });
        let early = LLLParams::default().with_flags(ReductionFlags::default().early_red());
        group.bench_with_input(BenchmarkId::new("native-early-red", 2 * d), &basis, |b, basis| {
            b.iter_batched(
                || basis.clone(),
                |mut basis| black_box(reduce(&mut basis, NumericBackend::Native, &early).unwrap()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_gso_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("GSO update");

    for d in [10, 30, 50].iter() {
        let basis = uniform(*d, 40, 1).unwrap();
        group.bench_with_input(BenchmarkId::new("full", d), &basis, |b, basis| {
            b.iter_batched(
                || basis.clone(),
                |mut basis| {
                    let mut engine = GsoEngine::new(&mut basis, NumericBackend::DoubleDouble).unwrap();
                    engine.update_gso_all().unwrap();
                    black_box(engine.get_r(*d - 1).unwrap())
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lll_backends, bench_lll_dimensions, bench_gso_update);
criterion_main!(benches);
