//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::dsp::oscillator::{sine_table, Oscillator, Waveform};
use polysynth::WAVETABLE_SIZE;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::BLOCK_SIZES;

const SR: f32 = 48_000.0;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");
    let table = sine_table(WAVETABLE_SIZE);
    let mut rng = SmallRng::seed_from_u64(7);

    let shapes = [
        ("sine", Waveform::Sine),
        ("saw", Waveform::Saw),
        ("square", Waveform::Square),
        ("triangle", Waveform::Triangle),
        ("noise", Waveform::Noise),
        ("wavetable", Waveform::Wavetable),
    ];

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, waveform) in shapes {
            let mut osc = Oscillator::new(waveform);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        *sample = osc.next_sample(440.0, SR, 0.0, &table, &mut rng).0;
                    }
                    black_box(&buffer);
                })
            });
        }

        // Five detuned saws: the most expensive per-voice oscillator setting
        let mut osc = Oscillator::new(Waveform::Saw);
        osc.set_unison(5);
        osc.set_detune(25.0);
        group.bench_with_input(BenchmarkId::new("saw_unison5", size), &size, |b, _| {
            b.iter(|| {
                for sample in buffer.iter_mut() {
                    *sample = osc.next_sample(black_box(110.0), SR, 0.0, &table, &mut rng).0;
                }
                black_box(&buffer);
            })
        });
    }

    group.finish();
}
