//! Benchmarks for DSP primitives and full-engine scenarios.
//!
//! Run with: cargo bench
//!
//! Every block has to finish well inside the audio callback deadline.
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Low-level primitives (oscillator, filter, envelope, etc.)
//!   - scenarios/*  Whole engine blocks and the master effects chain

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

/// Sine test signal for effect inputs.
pub fn test_signal(size: usize) -> Vec<f32> {
    (0..size).map(|i| (i as f32 * 0.1).sin() * 0.5).collect()
}

criterion_group!(
    benches,
    // Low-level DSP primitives
    dsp::bench_oscillator,
    dsp::bench_filter,
    dsp::bench_envelope,
    dsp::bench_distortion,
    dsp::bench_delay,
    dsp::bench_chorus,
    dsp::bench_reverb,
    dsp::bench_compressor,
    dsp::bench_mix,
    // Full engine
    scenarios::bench_voices,
    scenarios::bench_effects,
);
criterion_main!(benches);
