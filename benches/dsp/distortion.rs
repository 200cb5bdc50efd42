//! Benchmarks for tanh waveshaping.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::distortion::{soft_limit, Distortion};

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_distortion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/distortion");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);

        // Drive stage with dry/wet blend
        let distortion = Distortion::new(8.0, 0.7);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("drive", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                distortion.render(black_box(&mut buffer));
            })
        });

        // Master soft limiter, run on every output sample
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("soft_limit", size), &size, |b, _| {
            b.iter(|| {
                for (out, &x) in buffer.iter_mut().zip(&input) {
                    *out = soft_limit(black_box(x * 2.0));
                }
            })
        });
    }

    group.finish();
}
