#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::f32::consts::TAU;

use rand::Rng;

use crate::MAX_UNISON;

/*
Unison Oscillator
=================

Each synth voice carries two of these. An oscillator here is a small stack
of 1 to 5 phase accumulators ("unison sub-oscillators") that share one
waveform and are mistuned slightly against each other.

Vocabulary
----------

  phase       Position within one cycle, 0.0 to 1.0. Every sample:
                  phase += frequency / sample_rate
              and wraps back into [0, 1) when it passes 1.0.

  unison      How many sub-oscillators sound at once (1-5). Their outputs
              are averaged so the level stays put as the count changes.

  detune      Spread of the unison stack in cents (100 cents = 1 semitone).
              Sub-oscillator i of N sits at

                  offset_i = detune × (2i / (N - 1) - 1)

              so N = 5, detune = 15 gives -15, -7.5, 0, +7.5, +15 cents.

  hard sync   When the primary phase of oscillator 1 wraps, every phase of
              oscillator 2 is forced back to zero. Oscillator 2 then only
              completes partial cycles, which gives the classic tearing
              sync sweep when its pitch is modulated.

  pulse width Duty cycle of the square wave (0.01-0.99). 0.5 is a square.

  drift       Analog instability. Once per block each phase is nudged by a
              random amount of at most drift × 0.002 cycles.


Waveforms
---------

  Sine        sin(2π·phase)
  Saw         2·phase - 1, with a polyBLEP correction at the wrap
  Square      +1 below pulse width, -1 above, polyBLEP at both edges
  Triangle    4·|phase - 0.5| - 1
  Noise       uniform random in [-1, 1], pitch ignored
  Wavetable   single-cycle table, linear interpolation between entries;
              falls back to sine when no table is loaded

PolyBLEP subtracts a two-sample polynomial from each discontinuity. The
naive saw aliases audibly above a few kHz; the corrected one stays clean
enough for a synth voice without oversampling.
*/

/// Smallest and largest duty cycle accepted by the square wave.
pub const PULSE_WIDTH_RANGE: (f32, f32) = (0.01, 0.99);
/// Largest phase nudge per block, in cycles, at full drift.
pub const DRIFT_MAX_CYCLES: f32 = 0.002;
/// Upper limit for the unison spread.
pub const MAX_DETUNE_CENTS: f32 = 100.0;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    #[default]
    Saw,
    Square,
    Triangle,
    Noise,
    Wavetable,
}

impl Waveform {
    pub const ALL: [Waveform; 6] = [
        Waveform::Sine,
        Waveform::Saw,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Noise,
        Waveform::Wavetable,
    ];

    /// Map a parameter index to a waveform, clamping out-of-range values.
    pub fn from_index(index: i32) -> Self {
        let last = Self::ALL.len() as i32 - 1;
        Self::ALL[index.clamp(0, last) as usize]
    }

    pub fn index(self) -> i32 {
        Self::ALL.iter().position(|&w| w == self).unwrap_or(0) as i32
    }
}

#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[inline]
fn wrap_phase(phase: f32) -> f32 {
    phase - phase.floor()
}

/// Read a single-cycle table at `phase` with linear interpolation.
#[inline]
pub fn read_wavetable(table: &[f32], phase: f32) -> f32 {
    if table.is_empty() {
        return (TAU * phase).sin();
    }
    let len = table.len();
    let position = wrap_phase(phase) * len as f32;
    let index = (position as usize).min(len - 1);
    let frac = position - index as f32;
    let a = table[index];
    let b = table[(index + 1) % len];
    a + (b - a) * frac
}

/// Evaluate one waveform sample at `phase`.
///
/// `dt` is the per-sample phase increment, used for the polyBLEP width.
#[inline]
pub fn waveform_sample<R: Rng>(
    waveform: Waveform,
    phase: f32,
    dt: f32,
    pulse_width: f32,
    table: &[f32],
    rng: &mut R,
) -> f32 {
    let dt = dt.clamp(1.0e-6, 0.5);
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Saw => 2.0 * phase - 1.0 - poly_blep(phase, dt),
        Waveform::Square => {
            let naive = if phase < pulse_width { 1.0 } else { -1.0 };
            naive + poly_blep(phase, dt) - poly_blep(wrap_phase(phase - pulse_width + 1.0), dt)
        }
        Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        Waveform::Noise => rng.gen_range(-1.0..=1.0),
        Waveform::Wavetable => read_wavetable(table, phase),
    }
}

/// Up to five detuned phase accumulators sharing one waveform.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    unison: usize,
    detune_cents: f32,
    pulse_width: f32,
    drift: f32,
    phases: [f32; MAX_UNISON],
    /// Frequency multiplier per sub-oscillator, cached from detune.
    ratios: [f32; MAX_UNISON],
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        let mut osc = Self {
            waveform,
            unison: 1,
            detune_cents: 0.0,
            pulse_width: 0.5,
            drift: 0.0,
            phases: [0.0; MAX_UNISON],
            ratios: [1.0; MAX_UNISON],
        };
        osc.update_ratios();
        osc
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn set_unison(&mut self, count: usize) {
        self.unison = count.clamp(1, MAX_UNISON);
        self.update_ratios();
    }

    pub fn set_detune(&mut self, cents: f32) {
        self.detune_cents = cents.clamp(0.0, MAX_DETUNE_CENTS);
        self.update_ratios();
    }

    pub fn set_pulse_width(&mut self, width: f32) {
        self.pulse_width = width.clamp(PULSE_WIDTH_RANGE.0, PULSE_WIDTH_RANGE.1);
    }

    pub fn set_drift(&mut self, drift: f32) {
        self.drift = drift.clamp(0.0, 1.0);
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn unison(&self) -> usize {
        self.unison
    }

    pub fn pulse_width(&self) -> f32 {
        self.pulse_width
    }

    pub fn phases(&self) -> &[f32] {
        &self.phases[..self.unison]
    }

    /// Detune offset in cents for each active sub-oscillator.
    pub fn detune_offsets(&self) -> [f32; MAX_UNISON] {
        let mut offsets = [0.0; MAX_UNISON];
        if self.unison > 1 {
            let span = (self.unison - 1) as f32;
            for (i, offset) in offsets.iter_mut().take(self.unison).enumerate() {
                *offset = self.detune_cents * (2.0 * i as f32 / span - 1.0);
            }
        }
        offsets
    }

    /// Instantaneous frequency of each active sub-oscillator for `base_hz`.
    pub fn unison_frequencies(&self, base_hz: f32) -> [f32; MAX_UNISON] {
        let mut freqs = [0.0; MAX_UNISON];
        for (freq, ratio) in freqs.iter_mut().zip(self.ratios).take(self.unison) {
            *freq = base_hz * ratio;
        }
        freqs
    }

    /// Start a new note. The primary phase starts at zero; the others are
    /// scattered so a wide unison stack doesn't begin with a spike.
    pub fn retrigger<R: Rng>(&mut self, rng: &mut R) {
        self.phases[0] = 0.0;
        for phase in self.phases.iter_mut().skip(1) {
            *phase = rng.gen::<f32>();
        }
    }

    /// Hard sync: every phase back to zero.
    pub fn sync(&mut self) {
        self.phases = [0.0; MAX_UNISON];
    }

    /// Per-block random phase nudge, bounded by `drift × DRIFT_MAX_CYCLES`.
    pub fn apply_drift<R: Rng>(&mut self, rng: &mut R) {
        if self.drift <= 0.0 {
            return;
        }
        let bound = self.drift * DRIFT_MAX_CYCLES;
        for phase in self.phases.iter_mut().take(self.unison) {
            *phase = wrap_phase(*phase + rng.gen_range(-bound..=bound));
        }
    }

    /// Produce one sample at `base_hz` and advance every phase.
    ///
    /// `pwm_offset` is added to the base pulse width before clamping.
    /// Returns the sample and whether the primary phase wrapped, which the
    /// caller uses to drive hard sync on a second oscillator.
    #[inline]
    pub fn next_sample<R: Rng>(
        &mut self,
        base_hz: f32,
        sample_rate: f32,
        pwm_offset: f32,
        table: &[f32],
        rng: &mut R,
    ) -> (f32, bool) {
        let width = (self.pulse_width + pwm_offset).clamp(PULSE_WIDTH_RANGE.0, PULSE_WIDTH_RANGE.1);
        let base_inc = base_hz.max(0.0) / sample_rate;

        let mut sum = 0.0;
        let mut wrapped = false;
        for i in 0..self.unison {
            let dt = base_inc * self.ratios[i];
            let phase = self.phases[i];
            sum += waveform_sample(self.waveform, phase, dt, width, table, rng);

            let mut next = phase + dt;
            if next >= 1.0 {
                next = wrap_phase(next);
                if i == 0 {
                    wrapped = true;
                }
            }
            self.phases[i] = next;
        }

        (sum / self.unison as f32, wrapped)
    }

    fn update_ratios(&mut self) {
        let offsets = self.detune_offsets();
        for (ratio, cents) in self.ratios.iter_mut().zip(offsets) {
            *ratio = 2.0_f32.powf(cents / 1200.0);
        }
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(Waveform::Saw)
    }
}

/// A one-cycle sine table, the default content of the wavetable slot.
pub fn sine_table(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (TAU * i as f32 / len as f32).sin())
        .collect()
}
