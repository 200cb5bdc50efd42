//! Whole-engine scenario benchmarks.
//!
//! These run complete blocks through `SynthEngine` the way the audio
//! callback does, from a single lead note up to a full chord with every
//! effect enabled.

mod effects;
mod voices;

pub use effects::bench_effects;
pub use voices::bench_voices;
