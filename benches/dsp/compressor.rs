//! Benchmarks for the master bus compressor.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::compressor::Compressor;

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_compressor(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/compressor");

    for &size in BLOCK_SIZES {
        // Loud enough to sit above threshold most of the time
        let input: Vec<f32> = test_signal(size).iter().map(|s| s * 1.8).collect();
        let mut left = input.clone();
        let mut right = input.clone();

        let mut comp = Compressor::new(48_000.0);
        comp.set_threshold(0.5);
        comp.set_ratio(4.0);
        group.bench_with_input(BenchmarkId::new("stereo", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    (*l, *r) = comp.process(*l, *r);
                }
                black_box((&left, &right));
            })
        });
    }

    group.finish();
}
