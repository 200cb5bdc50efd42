//! Benchmarks for complete engine blocks.
//!
//! Each scenario configures a patch through the handle, holds some notes,
//! and then measures `SynthEngine::process` on a sustained block.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use polysynth::synth::modulation::{ModDestination, ModSource};
use polysynth::{EngineConfig, EngineHandle, ParamId, SynthEngine};

use crate::BLOCK_SIZES;

const CHORD: [u8; 8] = [48, 52, 55, 59, 60, 64, 67, 71];

fn engine_with(setup: impl Fn(&EngineHandle), notes: &[u8]) -> SynthEngine {
    let (mut engine, handle, _) = SynthEngine::new(EngineConfig::default());
    setup(&handle);
    for &note in notes {
        let _ = handle.note_on(note, 100);
    }
    // Get past the attack so the block measures sustained voices
    let mut warmup = vec![0.0f32; 4096 * 2];
    engine.process(&mut warmup, 4096);
    engine
}

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");

    for &size in BLOCK_SIZES {
        let mut out = vec![0.0f32; size * 2];

        // === SINGLE LEAD ===
        // Init patch, one note. Baseline cost of one voice.
        let mut lead = engine_with(|_| {}, &CHORD[4..5]);
        group.bench_with_input(BenchmarkId::new("lead", size), &size, |b, _| {
            b.iter(|| {
                lead.process(black_box(&mut out), size);
            })
        });

        // === ACID BASS ===
        // One voice, resonant lowpass swept by an LFO through the matrix
        let mut acid = engine_with(
            |h| {
                let _ = h.push_param(ParamId::FilterCutoff, 400.0);
                let _ = h.push_param(ParamId::FilterResonance, 0.8);
                let _ = h.push_param(ParamId::LfoRate(0), 2.0);
                let _ = h.push_param(ParamId::ModSource(0), ModSource::Lfo1.index());
                let _ = h.push_param(
                    ParamId::ModDestination(0),
                    ModDestination::FilterCutoff.index(),
                );
                let _ = h.push_param(ParamId::ModAmount(0), 0.6);
            },
            &CHORD[0..1],
        );
        group.bench_with_input(BenchmarkId::new("acid_bass", size), &size, |b, _| {
            b.iter(|| {
                acid.process(black_box(&mut out), size);
            })
        });

        // === FULL CHORD ===
        // All eight voices on the init patch
        let mut chord = engine_with(|_| {}, &CHORD);
        group.bench_with_input(BenchmarkId::new("chord_8", size), &size, |b, _| {
            b.iter(|| {
                chord.process(black_box(&mut out), size);
            })
        });

        // === SUPERSAW PAD ===
        // Worst case: eight voices, both oscillators at five unison voices
        let mut pad = engine_with(
            |h| {
                let _ = h.push_param(ParamId::Osc1Unison, 5);
                let _ = h.push_param(ParamId::Osc1Detune, 25.0);
                let _ = h.push_param(ParamId::Osc2Unison, 5);
                let _ = h.push_param(ParamId::Osc2Detune, 25.0);
                let _ = h.push_param(ParamId::Osc2Level, 0.8);
            },
            &CHORD,
        );
        group.bench_with_input(BenchmarkId::new("supersaw_8", size), &size, |b, _| {
            b.iter(|| {
                pad.process(black_box(&mut out), size);
            })
        });
    }

    group.finish();
}
