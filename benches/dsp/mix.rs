//! Benchmarks for signal mixing operations.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::mix;

use crate::BLOCK_SIZES;

pub fn bench_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/mix");

    for &size in BLOCK_SIZES {
        let signal_a: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();
        let signal_b: Vec<f32> = (0..size).map(|i| (i as f32 * 0.15).cos()).collect();

        // Sum in-place (voice accumulation)
        let mut buffer_a = signal_a.clone();
        group.bench_with_input(BenchmarkId::new("sum_in_place", size), &size, |b, _| {
            b.iter(|| {
                buffer_a.copy_from_slice(&signal_a);
                mix::sum_in_place(black_box(&mut buffer_a), black_box(&signal_b));
            })
        });

        // Dry/wet blend per sample (every effect stage)
        let mut output = vec![0.0f32; size];
        group.bench_with_input(BenchmarkId::new("dry_wet", size), &size, |b, _| {
            b.iter(|| {
                for ((out, &dry), &wet) in output.iter_mut().zip(&signal_a).zip(&signal_b) {
                    *out = mix::blend_dry_wet(dry, wet, black_box(0.3));
                }
            })
        });

        // Peak metering for status snapshots
        group.bench_with_input(BenchmarkId::new("peak", size), &size, |b, _| {
            b.iter(|| black_box(mix::peak(black_box(&signal_a))))
        });
    }

    group.finish();
}
