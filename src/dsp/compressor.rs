use crate::MIN_TIME;

/*
Compressor
==========

A compressor turns loud passages down and leaves quiet ones alone, evening
out the dynamics of the mix before it hits the limiter.

Vocabulary
----------

  envelope      A smoothed measure of how loud the input is right now.
                Rises quickly (attack) and falls slowly (release).

  threshold     Level above which gain reduction starts (linear, 0..1).

  ratio         How hard the signal is pushed down above the threshold.
                4:1 means 4 units of input over the threshold come out as 1.

  makeup        Fixed output gain applied after compression to win back the
                level the compressor removed.


Envelope Follower
-----------------

    level = max(|left|, |right|)
    coef  = exp(-1 / (time × sample_rate))      time = attack or release
    env   = coef × env + (1 - coef) × level

Attack is used while the level is above the envelope, release while it is
below. Both channels share one envelope so the stereo image does not shift.


Gain Computer
-------------

    env <= threshold:   gain = 1
    env >  threshold:   gain = (env / threshold)^(1/ratio - 1)

At ratio 1 the exponent is 0 and nothing happens; as ratio grows the curve
approaches a hard limit at the threshold.
*/

pub const THRESHOLD_RANGE: (f32, f32) = (0.01, 1.0);
pub const RATIO_RANGE: (f32, f32) = (1.0, 20.0);
pub const MAKEUP_RANGE: (f32, f32) = (0.0, 2.0);

/// Stereo-linked peak compressor.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f32,
    threshold: f32,
    ratio: f32,
    attack_coef: f32,
    release_coef: f32,
    makeup: f32,
    envelope: f32,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        let mut comp = Self {
            sample_rate,
            threshold: 0.7,
            ratio: 4.0,
            attack_coef: 0.0,
            release_coef: 0.0,
            makeup: 1.5,
            envelope: 0.0,
        };
        comp.set_attack(0.005);
        comp.set_release(0.1);
        comp
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = clamp_or(threshold, THRESHOLD_RANGE, THRESHOLD_RANGE.1);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = clamp_or(ratio, RATIO_RANGE, RATIO_RANGE.0);
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.attack_coef = smoothing_coef(seconds, self.sample_rate);
    }

    pub fn set_release(&mut self, seconds: f32) {
        self.release_coef = smoothing_coef(seconds, self.sample_rate);
    }

    pub fn set_makeup(&mut self, gain: f32) {
        self.makeup = clamp_or(gain, MAKEUP_RANGE, 1.0);
    }

    /// Current envelope follower level.
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Gain the computer applies at the current envelope, before makeup.
    pub fn gain_reduction(&self) -> f32 {
        if self.envelope > self.threshold {
            (self.envelope / self.threshold).powf(1.0 / self.ratio - 1.0)
        } else {
            1.0
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let level = left.abs().max(right.abs());
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let gain = self.gain_reduction() * self.makeup;
        (left * gain, right * gain)
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}

fn smoothing_coef(seconds: f32, sample_rate: f32) -> f32 {
    let seconds = if seconds.is_nan() { MIN_TIME } else { seconds.max(MIN_TIME) };
    (-1.0 / (seconds * sample_rate)).exp()
}

#[inline]
fn clamp_or(value: f32, range: (f32, f32), fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(range.0, range.1)
    }
}
