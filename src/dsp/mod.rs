//! Low-level DSP primitives used by the voices and the effects chain.
//!
//! These components allocate only at construction and are realtime-safe
//! afterwards, making them safe to embed directly inside voice structs. They
//! stay focused on the signal-processing math; the synth layer handles
//! orchestration and modulation.

/// Stereo modulated-delay chorus.
pub mod chorus;
/// Stereo-linked peak compressor.
pub mod compressor;
/// Circular delay lines and the feedback echo stage.
pub mod delay;
/// tanh waveshaper and the master soft limiter.
pub mod distortion;
/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// Low-frequency oscillators and the global LFO bank.
pub mod lfo;
pub mod mix;
/// Unison oscillator, waveforms and noise sources.
pub mod oscillator;
/// Schroeder reverb.
pub mod reverb;
pub mod tempo;

pub use envelope::EnvelopeStage;
