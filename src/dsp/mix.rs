//! Signal mixing, crossfading and panning primitives.

/*
Signal Mixing
=============

Mixing combines two signals by ADDING them together, optionally with weights.

Vocabulary
----------

  wet/dry       Common terminology for effect mixing.
                  dry = original signal (unprocessed)
                  wet = effect signal (processed)
                A "30% wet" mix means mix = 0.3.

  summing       Adding signals at equal levels (no weighting). Can exceed
                full scale, which is why the engine limits after the mix.

  pan           Position of a mono signal in the stereo field, -1.0 (hard
                left) to +1.0 (hard right).


Linear Crossfade
----------------

    output = dry × (1 - mix) + wet × mix

The weights always sum to 1.0, preventing overall level boost.


Equal-Power Panning
-------------------

Splitting a mono voice into two channels with linear weights makes the
centre sound quieter than either side (power adds, not amplitude). The pan
law used here keeps left² + right² = 1:

    angle = (pan + 1) × π/4          0 .. π/2
    left  = cos(angle)
    right = sin(angle)

    pan    left    right
    -1.0   1.000   0.000
     0.0   0.707   0.707
    +1.0   0.000   1.000
*/

use std::f32::consts::FRAC_PI_4;

/// Blend dry and wet samples using linear crossfade (single sample version).
///
/// output = (dry × (1-mix)) + (wet × mix)
#[inline]
pub fn blend_dry_wet(dry: f32, wet: f32, mix: f32) -> f32 {
    dry * (1.0 - mix) + wet * mix
}

/// Add signal B into signal A in-place (summing).
///
/// ⚠️ WARNING: Can exceed [-1.0, +1.0] range!
#[inline]
pub fn sum_in_place(a: &mut [f32], b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb;
    }
}

/// Constant-power pan gains `(left, right)` for `pan` in [-1, 1].
#[inline]
pub fn equal_power_pan(pan: f32) -> (f32, f32) {
    let pan = if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) };
    let angle = (pan + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

/// Peak absolute value of a buffer.
#[inline]
pub fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()))
}
