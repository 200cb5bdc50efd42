use std::f32::consts::TAU;

use crate::dsp::delay::DelayLine;
use crate::dsp::mix::blend_dry_wet;

/*
Chorus Effect
=============

Chorus thickens a sound by mixing the dry signal with a slightly delayed,
pitch-modulated copy. The modulation creates subtle detuning that makes
one voice sound like several playing together.

How It Works
------------

1. Input signal passes through unchanged (dry)
2. A copy is sent through a short delay (~20ms)
3. An LFO modulates the delay time, creating pitch variation
4. Dry and wet signals are mixed together

The right channel's LFO runs a quarter cycle ahead of the left, so the two
sides drift against each other and the image widens.

Parameters
----------

Rate (0.1 - 5.0 Hz):
  LFO speed. Slower = subtle shimmer, faster = vibrato-like wobble.

Depth (0.5 - 10.0 ms):
  How much the delay time varies around the 20 ms centre.

Mix (0.0 - 1.0):
  Dry/wet blend. 0.3-0.5 is typical for chorus.
*/

pub const BASE_DELAY_MS: f32 = 20.0;
pub const RATE_RANGE: (f32, f32) = (0.1, 5.0);
pub const DEPTH_RANGE_MS: (f32, f32) = (0.5, 10.0);

/// Stereo chorus - thickens sound with modulated delay
pub struct Chorus {
    lines: [DelayLine; 2],
    sample_rate: f32,
    lfo_phase: f32,
    rate: f32,
    depth_ms: f32,
    mix: f32,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        let max_ms = BASE_DELAY_MS + DEPTH_RANGE_MS.1 + 1.0;
        let capacity = (max_ms * sample_rate / 1000.0).ceil() as usize + 2;
        Self {
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            sample_rate,
            lfo_phase: 0.0,
            rate: 0.8,
            depth_ms: 3.0,
            mix: 0.5,
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = clamp_or(rate, RATE_RANGE, RATE_RANGE.0);
    }

    pub fn set_depth(&mut self, depth_ms: f32) {
        self.depth_ms = clamp_or(depth_ms, DEPTH_RANGE_MS, DEPTH_RANGE_MS.0);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = clamp_or(mix, (0.0, 1.0), 0.0);
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let phases = [self.lfo_phase, self.lfo_phase + 0.25];
        let mut out = [left, right];

        for (channel, sample) in out.iter_mut().enumerate() {
            let lfo = (TAU * phases[channel]).sin();
            let delay_ms = BASE_DELAY_MS + lfo * self.depth_ms;
            let delay_samples = delay_ms * self.sample_rate / 1000.0;

            let line = &mut self.lines[channel];
            line.write(*sample);
            let wet = line.read_interpolated(delay_samples);
            *sample = blend_dry_wet(*sample, wet, self.mix);
        }

        self.lfo_phase += self.rate / self.sample_rate;
        if self.lfo_phase >= 1.0 {
            self.lfo_phase -= 1.0;
        }

        (out[0], out[1])
    }

    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        self.lfo_phase = 0.0;
    }
}

#[inline]
fn clamp_or(value: f32, range: (f32, f32), fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(range.0, range.1)
    }
}
