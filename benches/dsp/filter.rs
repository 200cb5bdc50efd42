//! Benchmarks for the state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::filter::{FilterMode, SVFilter};

use crate::{test_signal, BLOCK_SIZES};

const SR: f32 = 48_000.0;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    let modes = [
        ("lowpass", FilterMode::LowPass),
        ("highpass", FilterMode::HighPass),
        ("bandpass", FilterMode::BandPass),
        ("notch", FilterMode::Notch),
    ];

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut buffer = input.clone();

        for (name, mode) in modes {
            let mut filter = SVFilter::new(mode, SR);
            filter.set_params(1000.0, 0.5);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer));
                })
            });
        }

        // Coefficient update every 16 samples, as a voice does under modulation
        let mut filter = SVFilter::new(FilterMode::LowPass, SR);
        group.bench_with_input(BenchmarkId::new("lowpass_modulated", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                for (i, chunk) in buffer.chunks_mut(16).enumerate() {
                    filter.set_params(500.0 + i as f32 * 100.0, 0.7);
                    filter.render(black_box(chunk));
                }
            })
        });
    }

    group.finish();
}
