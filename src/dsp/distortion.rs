//! Distortion / Waveshaping
//!
//! Distortion adds harmonics by reshaping the waveform. The "drive" parameter
//! controls how aggressively the signal is pushed into the nonlinear region.
//!
//! # How Waveshaping Works
//!
//! A waveshaper applies a transfer function to each sample:
//!   output = f(input * drive)
//!
//! The effects chain uses `tanh` as f(). It is linear near zero, bends
//! smoothly, and saturates at ±1, so no drive setting can push the output
//! past full scale.
//!
//! # Drive Values
//!
//!   1.0  = Clean (barely any bend)
//!   2-4  = Warm saturation
//!   5-10 = Obvious distortion
//!   10+  = Heavy, aggressive
//!
//! The same curve, normalized, is the engine's output limiter:
//!
//! ```text
//! soft_limit(x) = tanh(1.5·x) / tanh(1.5)
//! ```
//!
//! which maps ±1 to exactly ±1 and bends everything above that smoothly
//! toward ±1/tanh(1.5) ≈ ±1.1 instead of clipping.

use crate::dsp::mix::blend_dry_wet;

pub const MIN_DRIVE: f32 = 1.0;
pub const MAX_DRIVE: f32 = 20.0;

/// Hyperbolic tangent saturation.
#[inline]
pub fn tanh_saturate(sample: f32, drive: f32) -> f32 {
    (sample * drive).tanh()
}

const LIMIT_CURVE: f32 = 1.5;

/// Normalized tanh limiter used on the master output.
#[inline]
pub fn soft_limit(sample: f32) -> f32 {
    (sample * LIMIT_CURVE).tanh() / LIMIT_CURVE.tanh()
}

/// Saturating waveshaper stage with dry/wet mix.
#[derive(Debug, Clone)]
pub struct Distortion {
    drive: f32,
    mix: f32,
}

impl Distortion {
    pub fn new(drive: f32, mix: f32) -> Self {
        let mut stage = Self { drive: 1.0, mix: 0.0 };
        stage.set_drive(drive);
        stage.set_mix(mix);
        stage
    }

    pub fn set_drive(&mut self, drive: f32) {
        self.drive = if drive.is_nan() {
            MIN_DRIVE
        } else {
            drive.clamp(MIN_DRIVE, MAX_DRIVE)
        };
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = if mix.is_nan() { 0.0 } else { mix.clamp(0.0, 1.0) };
    }

    #[inline]
    pub fn process(&self, sample: f32) -> f32 {
        blend_dry_wet(sample, tanh_saturate(sample, self.drive), self.mix)
    }

    /// Process interleaved or mono samples in place.
    pub fn render(&self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tanh_unity_drive_small_signal() {
        let output = tanh_saturate(0.1, 1.0);
        assert!((output - 0.0997).abs() < 0.001);
    }

    #[test]
    fn test_tanh_high_drive_saturates() {
        let output = tanh_saturate(1.0, 10.0);
        assert!(output > 0.99 && output <= 1.0);
    }

    #[test]
    fn test_soft_limit_maps_unity_to_unity() {
        assert!((soft_limit(1.0) - 1.0).abs() < 1e-6);
        assert!((soft_limit(-1.0) + 1.0).abs() < 1e-6);
        assert!(soft_limit(50.0) < 1.11);
        assert_eq!(soft_limit(0.0), 0.0);
    }

    #[test]
    fn test_dry_mix_is_identity() {
        let stage = Distortion::new(12.0, 0.0);
        let mut buffer = [0.3, -0.7, 0.05];
        stage.render(&mut buffer);
        assert_eq!(buffer, [0.3, -0.7, 0.05]);
    }

    #[test]
    fn test_drive_is_clamped() {
        let stage = Distortion::new(500.0, 1.0);
        let loud = stage.process(0.1);
        assert!((loud - (0.1f32 * MAX_DRIVE).tanh()).abs() < 1e-6);
    }
}
