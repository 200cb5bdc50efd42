//! Benchmarks for the stereo chorus.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::chorus::Chorus;

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_chorus(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/chorus");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut left = input.clone();
        let mut right = input.clone();

        let mut chorus = Chorus::new(48_000.0);
        chorus.set_rate(0.8);
        chorus.set_depth(5.0);
        chorus.set_mix(0.5);
        group.bench_with_input(BenchmarkId::new("stereo", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    (*l, *r) = chorus.process(*l, *r);
                }
                black_box((&left, &right));
            })
        });
    }

    group.finish();
}
