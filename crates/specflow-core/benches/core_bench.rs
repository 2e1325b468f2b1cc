//! Criterion benchmarks for specflow-core primitives
//!
//! Run with: cargo bench -p specflow-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use specflow_core::{
    FrequencyScale, WindowCoefficients, WindowFunction, fast_log2, fast_math, fast_sqrt,
};

const BLOCK_SIZES: &[usize] = &[1024, 4096, 8192];

fn magnitudes(size: usize) -> Vec<f64> {
    (0..size).map(|i| 1e-6 + (i as f64 * 0.37).sin().abs()).collect()
}

fn bench_log2(c: &mut Criterion) {
    let mut group = c.benchmark_group("log2");
    fast_math::warm_up();

    for &size in BLOCK_SIZES {
        let input = magnitudes(size);

        group.bench_with_input(BenchmarkId::new("fast_log2", size), &size, |b, _| {
            b.iter(|| {
                for &x in &input {
                    black_box(fast_log2(black_box(x)));
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("std_log2", size), &size, |b, _| {
            b.iter(|| {
                for &x in &input {
                    black_box(black_box(x).log2());
                }
            });
        });
    }

    group.finish();
}

fn bench_sqrt(c: &mut Criterion) {
    let mut group = c.benchmark_group("sqrt");
    let input = magnitudes(4096);

    group.bench_function("fast_sqrt", |b| {
        b.iter(|| {
            for &x in &input {
                black_box(fast_sqrt(black_box(x)));
            }
        });
    });

    group.bench_function("std_sqrt", |b| {
        b.iter(|| {
            for &x in &input {
                black_box(black_box(x).sqrt());
            }
        });
    });

    group.finish();
}

fn bench_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("Window");

    for &size in BLOCK_SIZES {
        group.bench_with_input(BenchmarkId::new("build", size), &size, |b, &size| {
            b.iter(|| black_box(WindowCoefficients::new(WindowFunction::BlackmanNuttall, size)));
        });

        let table = WindowCoefficients::new(WindowFunction::BlackmanNuttall, size);
        let src = magnitudes(size);
        let mut dst = vec![0.0; size];
        group.bench_with_input(BenchmarkId::new("apply", size), &size, |b, _| {
            b.iter(|| table.apply(black_box(&src), &mut dst));
        });
    }

    group.finish();
}

fn bench_scale(c: &mut Criterion) {
    let mut group = c.benchmark_group("FrequencyScale");

    for scale in FrequencyScale::ALL {
        group.bench_function(scale.name(), |b| {
            b.iter(|| {
                for i in 0..256 {
                    let v = scale.to_perceptual(black_box(50.0 + i as f64 * 78.0));
                    black_box(scale.from_perceptual(v));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_log2, bench_sqrt, bench_window, bench_scale);
criterion_main!(benches);
