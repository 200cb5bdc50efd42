//! Benchmarks for the master effects chain.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::effects::{EffectsChain, EffectsSettings};
use polysynth::{EngineConfig, ParamId, SynthEngine};

use crate::{test_signal, BLOCK_SIZES};

fn all_enabled() -> EffectsSettings {
    let mut settings = EffectsSettings::default();
    settings.distortion.enabled = true;
    settings.chorus.enabled = true;
    settings.delay.enabled = true;
    settings.reverb.enabled = true;
    settings.compressor.enabled = true;
    settings
}

pub fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/effects");

    for &size in BLOCK_SIZES {
        let input = test_signal(size);
        let mut left = input.clone();
        let mut right = input.clone();

        // Every stage bypassed: the cost of walking the chain
        let mut bypassed = EffectsChain::new(48_000.0);
        group.bench_with_input(BenchmarkId::new("chain_bypassed", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                bypassed.process(black_box(&mut left), black_box(&mut right));
            })
        });

        let mut chain = EffectsChain::new(48_000.0);
        chain.configure(&all_enabled(), 120.0);
        group.bench_with_input(BenchmarkId::new("chain_full", size), &size, |b, _| {
            b.iter(|| {
                left.copy_from_slice(&input);
                right.copy_from_slice(&input);
                chain.process(black_box(&mut left), black_box(&mut right));
            })
        });

        // Eight voices plus every effect: the heaviest realistic block
        let (mut engine, handle, _) = SynthEngine::new(EngineConfig::default());
        for id in [
            ParamId::DistortionEnabled,
            ParamId::ChorusEnabled,
            ParamId::DelayEnabled,
            ParamId::ReverbEnabled,
            ParamId::CompressorEnabled,
        ] {
            let _ = handle.push_param(id, true);
        }
        for note in [48, 52, 55, 59, 60, 64, 67, 71] {
            let _ = handle.note_on(note, 100);
        }
        let mut out = vec![0.0f32; size * 2];
        group.bench_with_input(BenchmarkId::new("engine_full", size), &size, |b, _| {
            b.iter(|| {
                engine.process(black_box(&mut out), size);
            })
        });
    }

    group.finish();
}
