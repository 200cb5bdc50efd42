//! Low frequency oscillators and the global LFO bank.

/*
Low Frequency Oscillators
=========================

An LFO is an oscillator running below the audio range whose output moves
other parameters instead of being heard. The engine owns four of them,
shared by every voice, and renders each one into a block buffer before the
voices run.

Vocabulary
----------

  rate        Cycles per second, 0.01 Hz to 50 Hz in free mode.

  sync        Instead of Hz, the period is a note division at the current
              tempo: a 1/4 LFO at 120 BPM runs at 2 Hz.

  depth       Output scale, 0.0 to 1.0.

  key sync    Phase resets to zero on every note-on, so each note gets the
              same modulation shape. Without it the LFO free-runs.

  fade-in     After the first key goes down, depth ramps linearly from 0 to
              full over `fade_in` seconds. Vibrato that creeps in.

  bipolar     Output swings -1.0 to +1.0. This is what every LFO emits.

  unipolar    Output in 0.0 to 1.0. Destinations that want this rescale at
              the consuming end (the modulation matrix), never here:

                  unipolar = (bipolar + 1.0) * 0.5


Shapes
------

  Sine          sin(2π·phase)
  Triangle      linear up and down, same period as sine
  Saw           rising ramp -1 → +1, snap back
  Square        +1 for the first half, -1 for the second
  SampleHold    a new random value each cycle, held flat in between
*/

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

use rand::Rng;

use crate::dsp::tempo::NoteDivision;
use crate::{MAX_BLOCK_SIZE, MAX_LFO};

pub const MIN_LFO_RATE: f32 = 0.01;
pub const MAX_LFO_RATE: f32 = 50.0;

/// Convert bipolar signal (-1.0 to +1.0) to unipolar (0.0 to 1.0).
#[inline]
pub fn bipolar_to_unipolar(bipolar: f32) -> f32 {
    (bipolar + 1.0) * 0.5
}

/// Convert unipolar signal (0.0 to 1.0) to bipolar (-1.0 to +1.0).
#[inline]
pub fn unipolar_to_bipolar(unipolar: f32) -> f32 {
    (unipolar * 2.0) - 1.0
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Saw,
    Square,
    SampleHold,
}

impl LfoWaveform {
    pub const ALL: [LfoWaveform; 5] = [
        LfoWaveform::Sine,
        LfoWaveform::Triangle,
        LfoWaveform::Saw,
        LfoWaveform::Square,
        LfoWaveform::SampleHold,
    ];

    pub fn from_index(index: i32) -> Self {
        let last = Self::ALL.len() as i32 - 1;
        Self::ALL[index.clamp(0, last) as usize]
    }

    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|&w| w == self).unwrap_or(0) as i32
    }
}

/// Settings for one LFO, as stored in the patch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoSettings {
    pub waveform: LfoWaveform,
    pub rate_hz: f32,
    /// When set, overrides `rate_hz` with a tempo-relative period.
    pub sync: Option<NoteDivision>,
    pub depth: f32,
    pub key_sync: bool,
    pub fade_in: f32,
}

impl Default for LfoSettings {
    fn default() -> Self {
        Self {
            waveform: LfoWaveform::Sine,
            rate_hz: 5.0,
            sync: None,
            depth: 1.0,
            key_sync: false,
            fade_in: 0.0,
        }
    }
}

impl LfoSettings {
    /// Rate in Hz at `bpm`, after sync and clamping.
    pub fn effective_rate(&self, bpm: f32) -> f32 {
        let rate = match self.sync {
            Some(division) => division.hz(bpm),
            None => self.rate_hz,
        };
        if rate.is_nan() {
            return MIN_LFO_RATE;
        }
        rate.clamp(MIN_LFO_RATE, MAX_LFO_RATE)
    }
}

#[derive(Debug, Clone)]
pub struct Lfo {
    settings: LfoSettings,
    phase: f32,
    held: f32,
    fade_gain: f32,
}

impl Lfo {
    pub fn new(settings: LfoSettings) -> Self {
        Self {
            settings,
            phase: 0.0,
            held: 0.0,
            fade_gain: 1.0,
        }
    }

    pub fn settings(&self) -> &LfoSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut LfoSettings {
        &mut self.settings
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Note-on: reset phase if key-synced; restart the fade if requested.
    pub fn trigger(&mut self, restart_fade: bool) {
        if self.settings.key_sync {
            self.phase = 0.0;
        }
        if restart_fade && self.settings.fade_in > 0.0 {
            self.fade_gain = 0.0;
        }
    }

    /// One output sample at `rate_hz`, then advance.
    #[inline]
    pub fn next_value<R: Rng>(&mut self, rate_hz: f32, sample_rate: f32, rng: &mut R) -> f32 {
        let shape = match self.settings.waveform {
            LfoWaveform::Sine => (TAU * self.phase).sin(),
            LfoWaveform::Triangle => 1.0 - 4.0 * (self.phase - 0.5).abs(),
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::SampleHold => self.held,
        };

        let depth = self.settings.depth.clamp(0.0, 1.0);
        let value = shape * depth * self.fade_gain;

        if self.fade_gain < 1.0 {
            let step = 1.0 / (self.settings.fade_in.max(1.0e-3) * sample_rate);
            self.fade_gain = (self.fade_gain + step).min(1.0);
        }

        self.phase += rate_hz / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
            if self.settings.waveform == LfoWaveform::SampleHold {
                self.held = rng.gen_range(-1.0..=1.0);
            }
        }

        value
    }

    /// Fill `out` with consecutive values. `rate_scale` multiplies the rate
    /// (matrix modulation of LFO speed).
    pub fn render<R: Rng>(
        &mut self,
        out: &mut [f32],
        bpm: f32,
        rate_scale: f32,
        sample_rate: f32,
        rng: &mut R,
    ) {
        let rate = (self.settings.effective_rate(bpm) * rate_scale).clamp(MIN_LFO_RATE, MAX_LFO_RATE);
        for sample in out.iter_mut() {
            *sample = self.next_value(rate, sample_rate, rng);
        }
    }
}

/// The four global LFOs and their per-block output buffers.
///
/// A block is rendered in pieces: `begin_block`, then `render` as many times
/// as needed, each call appending after the frames already written. Anything
/// that changes an LFO mid-block (key sync, a new rate scale) therefore takes
/// effect from the next frame rendered.
pub struct LfoBank {
    lfos: [Lfo; MAX_LFO],
    buffers: Vec<[f32; MAX_LFO]>,
    frames: usize,
    latest: [f32; MAX_LFO],
}

impl LfoBank {
    pub fn new() -> Self {
        Self {
            lfos: std::array::from_fn(|_| Lfo::new(LfoSettings::default())),
            buffers: vec![[0.0; MAX_LFO]; MAX_BLOCK_SIZE],
            frames: 0,
            latest: [0.0; MAX_LFO],
        }
    }

    pub fn lfo(&self, index: usize) -> Option<&Lfo> {
        self.lfos.get(index)
    }

    pub fn settings_mut(&mut self, index: usize) -> Option<&mut LfoSettings> {
        self.lfos.get_mut(index).map(Lfo::settings_mut)
    }

    /// Note-on for every LFO. `first_key` is true when no other key was held.
    pub fn note_on(&mut self, first_key: bool) {
        for lfo in &mut self.lfos {
            lfo.trigger(first_key);
        }
    }

    /// Start a new block. Buffers from the previous block are discarded;
    /// `snapshot` keeps reporting the last value rendered.
    pub fn begin_block(&mut self) {
        self.frames = 0;
    }

    /// Frames rendered so far in this block.
    pub fn rendered(&self) -> usize {
        self.frames
    }

    /// Render the next `frames` values of every LFO, after the frames
    /// already rendered this block. `rate_scales` comes from the matrix's
    /// LFO-rate destinations.
    pub fn render<R: Rng>(
        &mut self,
        frames: usize,
        bpm: f32,
        rate_scales: [f32; MAX_LFO],
        sample_rate: f32,
        rng: &mut R,
    ) {
        let start = self.frames;
        let end = (start + frames).min(MAX_BLOCK_SIZE);
        if end == start {
            return;
        }
        for (index, lfo) in self.lfos.iter_mut().enumerate() {
            let rate = (lfo.settings.effective_rate(bpm) * rate_scales[index])
                .clamp(MIN_LFO_RATE, MAX_LFO_RATE);
            for frame in &mut self.buffers[start..end] {
                frame[index] = lfo.next_value(rate, sample_rate, rng);
            }
        }
        self.frames = end;
        self.latest = self.buffers[end - 1];
    }

    /// All four LFO values at `frame` of the last rendered block.
    #[inline]
    pub fn values_at(&self, frame: usize) -> [f32; MAX_LFO] {
        if self.frames == 0 {
            return [0.0; MAX_LFO];
        }
        self.buffers[frame.min(self.frames - 1)]
    }

    /// The most recently rendered value of every LFO.
    pub fn snapshot(&self) -> [f32; MAX_LFO] {
        self.latest
    }
}

impl Default for LfoBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(3)
    }

    #[test]
    fn test_bipolar_unipolar_conversions() {
        assert_eq!(bipolar_to_unipolar(-1.0), 0.0);
        assert_eq!(bipolar_to_unipolar(0.0), 0.5);
        assert_eq!(unipolar_to_bipolar(1.0), 1.0);
    }

    #[test]
    fn every_shape_is_bipolar_and_bounded() {
        let mut rng = rng();
        for waveform in LfoWaveform::ALL {
            let mut lfo = Lfo::new(LfoSettings {
                waveform,
                ..LfoSettings::default()
            });
            let mut out = vec![0.0; 4000];
            lfo.render(&mut out, 120.0, 1.0, SAMPLE_RATE, &mut rng);

            let max = out.iter().cloned().fold(f32::MIN, f32::max);
            let min = out.iter().cloned().fold(f32::MAX, f32::min);
            assert!(max <= 1.0 && min >= -1.0, "{:?} out of range", waveform);
            if waveform != LfoWaveform::SampleHold {
                assert!(max > 0.9 && min < -0.9, "{:?} should be bipolar", waveform);
            }
        }
    }

    #[test]
    fn tempo_sync_overrides_rate() {
        let settings = LfoSettings {
            rate_hz: 9.0,
            sync: Some(NoteDivision::EIGHTH),
            ..LfoSettings::default()
        };
        // Eighth note at 120 BPM = 0.25 s
        assert!((settings.effective_rate(120.0) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn key_sync_resets_phase() {
        let mut rng = rng();
        let mut lfo = Lfo::new(LfoSettings {
            key_sync: true,
            ..LfoSettings::default()
        });
        let mut out = vec![0.0; 77];
        lfo.render(&mut out, 120.0, 1.0, SAMPLE_RATE, &mut rng);
        assert!(lfo.phase() > 0.0);

        lfo.trigger(false);
        assert_eq!(lfo.phase(), 0.0);
    }

    #[test]
    fn free_running_ignores_note_on() {
        let mut rng = rng();
        let mut lfo = Lfo::new(LfoSettings::default());
        let mut out = vec![0.0; 77];
        lfo.render(&mut out, 120.0, 1.0, SAMPLE_RATE, &mut rng);
        let phase = lfo.phase();
        lfo.trigger(true);
        assert_eq!(lfo.phase(), phase);
    }

    #[test]
    fn fade_in_ramps_depth() {
        let mut rng = rng();
        let mut lfo = Lfo::new(LfoSettings {
            waveform: LfoWaveform::Square,
            rate_hz: 0.01,
            fade_in: 0.5,
            ..LfoSettings::default()
        });
        lfo.trigger(true);

        let mut out = vec![0.0; 1000];
        lfo.render(&mut out, 120.0, 1.0, SAMPLE_RATE, &mut rng);

        assert!(out[0].abs() < 0.01, "starts silent");
        assert!((out[250] - 0.5).abs() < 0.02, "half depth halfway: {}", out[250]);
        assert!((out[999] - 1.0).abs() < 1e-6, "full depth after fade");
    }

    #[test]
    fn bank_renders_independent_lfos() {
        let mut rng = rng();
        let mut bank = LfoBank::new();
        if let Some(settings) = bank.settings_mut(1) {
            settings.waveform = LfoWaveform::Square;
        }
        if let Some(settings) = bank.settings_mut(2) {
            settings.depth = 0.0;
        }

        bank.render(64, 120.0, [1.0; MAX_LFO], SAMPLE_RATE, &mut rng);

        let first = bank.values_at(0);
        assert_eq!(first[0], 0.0, "sine starts at zero");
        assert_eq!(first[1], 1.0, "square starts high");
        assert_eq!(first[2], 0.0, "zero depth is silent");
        assert_eq!(bank.values_at(10_000), bank.values_at(63));
        assert_eq!(bank.snapshot(), bank.values_at(63));
        assert!(bank.settings_mut(7).is_none());
    }

    #[test]
    fn bank_appends_within_a_block() {
        let mut rng = rng();
        let mut whole = LfoBank::new();
        whole.begin_block();
        whole.render(64, 120.0, [1.0; MAX_LFO], SAMPLE_RATE, &mut rng);

        let mut pieces = LfoBank::new();
        pieces.begin_block();
        pieces.render(20, 120.0, [1.0; MAX_LFO], SAMPLE_RATE, &mut rng);
        pieces.render(44, 120.0, [1.0; MAX_LFO], SAMPLE_RATE, &mut rng);

        assert_eq!(pieces.rendered(), 64);
        for frame in [0, 19, 20, 63] {
            assert_eq!(pieces.values_at(frame)[0], whole.values_at(frame)[0]);
        }

        pieces.begin_block();
        assert_eq!(pieces.rendered(), 0);
        assert_eq!(pieces.snapshot(), whole.values_at(63), "snapshot survives the block");
    }

    #[test]
    fn key_sync_mid_block_restarts_from_next_frame() {
        let mut rng = rng();
        let mut bank = LfoBank::new();
        if let Some(settings) = bank.settings_mut(0) {
            settings.key_sync = true;
            settings.waveform = LfoWaveform::Saw;
        }
        bank.begin_block();
        bank.render(30, 120.0, [1.0; MAX_LFO], SAMPLE_RATE, &mut rng);
        assert!(bank.values_at(29)[0] > -1.0);

        bank.note_on(true);
        bank.render(30, 120.0, [1.0; MAX_LFO], SAMPLE_RATE, &mut rng);
        assert_eq!(bank.values_at(30)[0], -1.0, "saw restarts at phase zero");
    }
}
