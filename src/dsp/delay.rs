//! Circular delay lines and the feedback echo stage.

/*
Feedback Delay
==============

    input ──┬────────────────────────────────(dry)──┐
            │                                        ▼
            └──► (+) ──► [ delay line ] ──┬──(wet)──► mix ──► output
                  ▲                        │
                  └── × feedback ◄─ [tone] ◄┘

Each repeat passes through a one-pole low-pass ("tone") before it is fed
back, so echoes get darker as they decay, like tape or bucket-brigade
delays. Feedback is capped below 1.0 so the loop always dies out.

  time       seconds, or a note division at the current tempo
  feedback   0.0 to 0.99
  tone       0.0 (dark, ~500 Hz) to 1.0 (open, ~20 kHz)
  mix        dry/wet
*/

use std::f32::consts::TAU;

use crate::dsp::mix::blend_dry_wet;

/// Longest echo the stage supports, in seconds.
pub const MAX_DELAY_SECONDS: f32 = 2.0;
pub const MIN_DELAY_SECONDS: f32 = 0.001;
pub const MAX_FEEDBACK: f32 = 0.99;

/// Fixed-capacity circular buffer. Sized once at construction.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity.max(2)],
            write_pos: 0,
        }
    }

    /// Capacity in samples. The longest readable delay is `capacity - 1`.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Sample written `delay` writes ago (1 = most recent).
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1, len - 1);
        self.buffer[(self.write_pos + len - delay) % len]
    }

    /// Fractional read with linear interpolation.
    #[inline]
    pub fn read_interpolated(&self, delay: f32) -> f32 {
        let max = (self.buffer.len() - 2) as f32;
        let delay = delay.clamp(1.0, max);
        let whole = delay as usize;
        let frac = delay - whole as f32;
        let a = self.read(whole);
        let b = self.read(whole + 1);
        a + (b - a) * frac
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// One-pole low-pass used for damping and tone controls.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePole {
    state: f32,
    coeff: f32,
}

impl OnePole {
    pub fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: f32) {
        let cutoff = cutoff_hz.clamp(1.0, sample_rate * 0.49);
        self.coeff = 1.0 - (-TAU * cutoff / sample_rate).exp();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state += self.coeff * (input - self.state);
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// Map the 0..1 tone control to a cutoff between 500 Hz and 20 kHz.
#[inline]
pub fn tone_to_cutoff(tone: f32) -> f32 {
    500.0 * 40.0_f32.powf(tone.clamp(0.0, 1.0))
}

/// Stereo feedback delay.
pub struct StereoDelay {
    lines: [DelayLine; 2],
    tone: [OnePole; 2],
    sample_rate: f32,
    delay_samples: usize,
    feedback: f32,
    mix: f32,
}

impl StereoDelay {
    pub fn new(sample_rate: f32) -> Self {
        let capacity = (MAX_DELAY_SECONDS * sample_rate).ceil() as usize + 2;
        let mut stage = Self {
            lines: [DelayLine::new(capacity), DelayLine::new(capacity)],
            tone: [OnePole::default(); 2],
            sample_rate,
            delay_samples: 1,
            feedback: 0.0,
            mix: 0.0,
        };
        stage.set_time(0.35);
        stage.set_tone(0.6);
        stage
    }

    pub fn set_time(&mut self, seconds: f32) {
        let seconds = if seconds.is_nan() {
            MIN_DELAY_SECONDS
        } else {
            seconds.clamp(MIN_DELAY_SECONDS, MAX_DELAY_SECONDS)
        };
        let max = self.lines[0].capacity() - 1;
        self.delay_samples = ((seconds * self.sample_rate).round() as usize).clamp(1, max);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = if feedback.is_nan() {
            0.0
        } else {
            feedback.clamp(0.0, MAX_FEEDBACK)
        };
    }

    pub fn set_tone(&mut self, tone: f32) {
        let cutoff = tone_to_cutoff(tone);
        for filter in &mut self.tone {
            filter.set_cutoff(cutoff, self.sample_rate);
        }
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = if mix.is_nan() { 0.0 } else { mix.clamp(0.0, 1.0) };
    }

    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    /// Process one stereo frame.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let mut out = [left, right];
        for (channel, sample) in out.iter_mut().enumerate() {
            let delayed = self.lines[channel].read(self.delay_samples);
            let fed_back = self.tone[channel].process(delayed) * self.feedback;
            self.lines[channel].write(*sample + fed_back);
            *sample = blend_dry_wet(*sample, delayed, self.mix);
        }
        (out[0], out[1])
    }

    pub fn reset(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
        for filter in &mut self.tone {
            filter.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_line_reads_back_in_order() {
        let mut line = DelayLine::new(8);
        for i in 1..=5 {
            line.write(i as f32);
        }
        assert_eq!(line.read(1), 5.0);
        assert_eq!(line.read(3), 3.0);
        assert_eq!(line.read_interpolated(1.5), 4.5);
    }

    #[test]
    fn delay_line_wraps() {
        let mut line = DelayLine::new(4);
        for i in 0..10 {
            line.write(i as f32);
        }
        assert_eq!(line.read(1), 9.0);
        assert_eq!(line.read(3), 7.0);
        assert_eq!(line.read(100), 7.0, "over-long reads clamp to capacity - 1");
    }

    #[test]
    fn echo_arrives_after_delay_time() {
        let sample_rate = 1_000.0;
        let mut delay = StereoDelay::new(sample_rate);
        delay.set_time(0.1);
        delay.set_mix(1.0);
        delay.set_feedback(0.0);

        let mut outputs = Vec::new();
        outputs.push(delay.process(1.0, 1.0).0);
        for _ in 0..200 {
            outputs.push(delay.process(0.0, 0.0).0);
        }

        let echo_at = outputs.iter().position(|&x| x > 0.5);
        assert_eq!(echo_at, Some(100));
    }

    #[test]
    fn feedback_repeats_decay() {
        let sample_rate = 1_000.0;
        let mut delay = StereoDelay::new(sample_rate);
        delay.set_time(0.05);
        delay.set_mix(1.0);
        delay.set_feedback(0.5);
        delay.set_tone(1.0);

        delay.process(1.0, 1.0);
        let mut repeats = Vec::new();
        for i in 1..=200 {
            let (l, _) = delay.process(0.0, 0.0);
            if i % 50 == 0 {
                repeats.push(l);
            }
        }

        assert!(repeats[0] > 0.9);
        assert!(repeats[1] < repeats[0] && repeats[1] > 0.1);
        assert!(repeats[3] < repeats[2]);
    }

    #[test]
    fn max_feedback_stays_bounded() {
        let mut delay = StereoDelay::new(48_000.0);
        delay.set_time(0.01);
        delay.set_feedback(5.0);
        delay.set_mix(0.5);
        for _ in 0..48_000 {
            let (l, r) = delay.process(0.2, -0.2);
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() < 50.0);
        }
    }
}
