//! Benchmarks for the comb/allpass reverb.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::reverb::Reverb;

use crate::{test_signal, BLOCK_SIZES};

pub fn bench_reverb(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/reverb");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut left = input.clone();
        let mut right = input.clone();

        for &room in &[0.1f32, 0.95] {
            let mut reverb = Reverb::new(48_000.0);
            reverb.set_size(room);
            reverb.set_damping(0.5);
            reverb.set_mix(0.3);
            group.bench_with_input(
                BenchmarkId::new(format!("size_{room}"), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        left.copy_from_slice(&input);
                        right.copy_from_slice(&input);
                        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                            (*l, *r) = reverb.process(*l, *r);
                        }
                        black_box((&left, &right));
                    })
                },
            );
        }
    }

    group.finish();
}
