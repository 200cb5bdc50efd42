//! Benchmarks for delay lines and the stereo feedback delay.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::delay::{DelayLine, StereoDelay};

use crate::{test_signal, BLOCK_SIZES};

const SR: f32 = 48_000.0;

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);

        // Fractional read (used by the chorus)
        let mut line = DelayLine::new(4096);
        for &sample in &input {
            line.write(sample);
        }
        group.bench_with_input(BenchmarkId::new("read_interpolated", size), &size, |b, _| {
            b.iter(|| {
                let mut acc = 0.0;
                for &sample in &input {
                    line.write(sample);
                    acc += line.read_interpolated(black_box(240.5));
                }
                black_box(acc)
            })
        });

        // Full stereo delay at different times
        for &seconds in &[0.05f32, 0.5, 2.0] {
            let mut delay = StereoDelay::new(SR);
            delay.set_time(seconds);
            delay.set_feedback(0.6);
            delay.set_mix(0.4);
            let mut left = input.clone();
            let mut right = input.clone();
            group.bench_with_input(
                BenchmarkId::new(format!("stereo_{}ms", (seconds * 1000.0) as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                            (*l, *r) = delay.process(*l, *r);
                        }
                        black_box((&left, &right));
                    })
                },
            );
        }
    }

    group.finish();
}
