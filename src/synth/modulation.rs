#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::lfo::bipolar_to_unipolar;
use crate::{MAX_LFO, MAX_MOD_SLOTS};

/*
Modulation Matrix
=================

The matrix is a small routing table: each slot says "take this source,
scale it by this amount, and add it to that destination". Any source can
reach any destination, and several slots may feed the same destination.

Vocabulary
----------

  source        A control signal. Global sources (LFOs, mod wheel,
                aftertouch) are the same for every voice; per-voice
                sources (envelopes, velocity, key track, random) differ.

  destination   The parameter being moved. Every destination receives a
                normalized offset in [-1, 1] which the consuming end
                scales into its own units.

  amount        Slot depth, -1.0 to +1.0. Negative amounts invert.

  bipolar       A source swinging both ways (-1..+1): LFOs, key track,
                random. Envelopes, velocity, wheel and aftertouch are
                unipolar (0..1).


Evaluation
----------

Once per control period (16 samples) and per voice:

    offset[dest] = clamp( Σ source[slot] × amount[slot], -1, 1 )

Amplitude and filter resonance only make sense pushed one way, so a bipolar
source routed to them is first folded to unipolar:

    source' = (source + 1) / 2

An LFO on amplitude with a negative amount is then a tremolo that dips
below the base level instead of swinging through it.


Destination Units
-----------------

    destination      offset ±1 means              applied as
    Osc pitch        ±24 semitones                note + 24·o
    Osc PWM          ±0.5 pulse width             width + 0.5·o
    Filter cutoff    ±5 octaves                   cutoff × 2^(5·o)
    Resonance        ±1                           res + o
    Amplitude        gain 0 .. 2                  gain = 1 + o
    Pan              ±1                           pan + o
    LFO rate         ×¼ .. ×4                     rate × 2^(2·o)

The result is clamped to the parameter's valid range at the consuming end.
LFO rate is global, so it is evaluated once per block from global sources
only; per-voice sources read as zero there.
*/

pub const PITCH_RANGE_SEMITONES: f32 = 24.0;
pub const PWM_RANGE: f32 = 0.5;
pub const CUTOFF_RANGE_OCTAVES: f32 = 5.0;
pub const LFO_RATE_RANGE_OCTAVES: f32 = 2.0;
/// Number of evaluated samples between matrix updates.
pub const CONTROL_PERIOD: usize = 16;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModSource {
    #[default]
    None,
    Lfo1,
    Lfo2,
    Lfo3,
    Lfo4,
    AmpEnvelope,
    FilterEnvelope,
    PitchEnvelope,
    Velocity,
    ModWheel,
    Aftertouch,
    KeyTrack,
    Random,
}

impl ModSource {
    pub const ALL: [ModSource; 13] = [
        ModSource::None,
        ModSource::Lfo1,
        ModSource::Lfo2,
        ModSource::Lfo3,
        ModSource::Lfo4,
        ModSource::AmpEnvelope,
        ModSource::FilterEnvelope,
        ModSource::PitchEnvelope,
        ModSource::Velocity,
        ModSource::ModWheel,
        ModSource::Aftertouch,
        ModSource::KeyTrack,
        ModSource::Random,
    ];
    pub const COUNT: usize = Self::ALL.len();

    pub fn from_index(index: i32) -> Self {
        let last = Self::COUNT as i32 - 1;
        Self::ALL[index.clamp(0, last) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }

    /// LFO source for bank slot `index`.
    pub fn lfo(index: usize) -> Option<Self> {
        match index {
            0 => Some(ModSource::Lfo1),
            1 => Some(ModSource::Lfo2),
            2 => Some(ModSource::Lfo3),
            3 => Some(ModSource::Lfo4),
            _ => None,
        }
    }

    pub fn is_bipolar(self) -> bool {
        matches!(
            self,
            ModSource::Lfo1
                | ModSource::Lfo2
                | ModSource::Lfo3
                | ModSource::Lfo4
                | ModSource::KeyTrack
                | ModSource::Random
        )
    }

    /// Same value for every voice.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            ModSource::Lfo1
                | ModSource::Lfo2
                | ModSource::Lfo3
                | ModSource::Lfo4
                | ModSource::ModWheel
                | ModSource::Aftertouch
        )
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModDestination {
    #[default]
    None,
    Osc1Pitch,
    Osc1Pwm,
    Osc2Pitch,
    Osc2Pwm,
    FilterCutoff,
    FilterResonance,
    Amplitude,
    Pan,
    /// Rate of LFO `0..4`.
    LfoRate(u8),
}

impl ModDestination {
    /// Destinations before the per-LFO rate targets, in index order.
    const FIXED: [ModDestination; 9] = [
        ModDestination::None,
        ModDestination::Osc1Pitch,
        ModDestination::Osc1Pwm,
        ModDestination::Osc2Pitch,
        ModDestination::Osc2Pwm,
        ModDestination::FilterCutoff,
        ModDestination::FilterResonance,
        ModDestination::Amplitude,
        ModDestination::Pan,
    ];
    pub const COUNT: usize = Self::FIXED.len() + MAX_LFO;

    pub fn from_index(index: i32) -> Self {
        let index = index.clamp(0, Self::COUNT as i32 - 1) as usize;
        match Self::FIXED.get(index) {
            Some(&dest) => dest,
            None => ModDestination::LfoRate((index - Self::FIXED.len()) as u8),
        }
    }

    pub fn index(self) -> i32 {
        match self {
            ModDestination::LfoRate(lfo) => {
                (Self::FIXED.len() + (lfo as usize).min(MAX_LFO - 1)) as i32
            }
            other => Self::FIXED.iter().position(|&d| d == other).unwrap_or(0) as i32,
        }
    }

    /// Destinations that take a one-directional input.
    pub fn is_unipolar(self) -> bool {
        matches!(
            self,
            ModDestination::Amplitude | ModDestination::FilterResonance
        )
    }
}

/// One routing: source × amount → destination.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModSlot {
    pub source: ModSource,
    pub destination: ModDestination,
    pub amount: f32,
}

impl ModSlot {
    pub const EMPTY: ModSlot = ModSlot {
        source: ModSource::None,
        destination: ModDestination::None,
        amount: 0.0,
    };

    pub fn new(source: ModSource, destination: ModDestination, amount: f32) -> Self {
        Self {
            source,
            destination,
            amount: clamp_amount(amount),
        }
    }

    pub fn is_active(&self) -> bool {
        self.source != ModSource::None
            && self.destination != ModDestination::None
            && self.amount != 0.0
    }
}

/// Source values for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModSources {
    values: [f32; ModSource::COUNT],
}

impl ModSources {
    pub fn new() -> Self {
        Self {
            values: [0.0; ModSource::COUNT],
        }
    }

    #[inline]
    pub fn set(&mut self, source: ModSource, value: f32) {
        if source != ModSource::None {
            self.values[source as usize] = if value.is_nan() { 0.0 } else { value };
        }
    }

    #[inline]
    pub fn get(&self, source: ModSource) -> f32 {
        self.values[source as usize]
    }

    pub fn set_lfos(&mut self, values: [f32; MAX_LFO]) {
        for (index, value) in values.into_iter().enumerate() {
            if let Some(source) = ModSource::lfo(index) {
                self.set(source, value);
            }
        }
    }
}

impl Default for ModSources {
    fn default() -> Self {
        Self::new()
    }
}

/// Summed, clamped destination offsets, each in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModOffsets {
    pub osc1_pitch: f32,
    pub osc1_pwm: f32,
    pub osc2_pitch: f32,
    pub osc2_pwm: f32,
    pub filter_cutoff: f32,
    pub filter_resonance: f32,
    pub amplitude: f32,
    pub pan: f32,
    pub lfo_rate: [f32; MAX_LFO],
}

impl ModOffsets {
    fn slot_mut(&mut self, destination: ModDestination) -> Option<&mut f32> {
        match destination {
            ModDestination::None => None,
            ModDestination::Osc1Pitch => Some(&mut self.osc1_pitch),
            ModDestination::Osc1Pwm => Some(&mut self.osc1_pwm),
            ModDestination::Osc2Pitch => Some(&mut self.osc2_pitch),
            ModDestination::Osc2Pwm => Some(&mut self.osc2_pwm),
            ModDestination::FilterCutoff => Some(&mut self.filter_cutoff),
            ModDestination::FilterResonance => Some(&mut self.filter_resonance),
            ModDestination::Amplitude => Some(&mut self.amplitude),
            ModDestination::Pan => Some(&mut self.pan),
            ModDestination::LfoRate(lfo) => self.lfo_rate.get_mut(lfo as usize),
        }
    }

    fn clamp_all(&mut self) {
        for value in [
            &mut self.osc1_pitch,
            &mut self.osc1_pwm,
            &mut self.osc2_pitch,
            &mut self.osc2_pwm,
            &mut self.filter_cutoff,
            &mut self.filter_resonance,
            &mut self.amplitude,
            &mut self.pan,
        ] {
            *value = value.clamp(-1.0, 1.0);
        }
        for value in &mut self.lfo_rate {
            *value = value.clamp(-1.0, 1.0);
        }
    }

    /// Pitch offsets in semitones for (osc1, osc2).
    pub fn pitch_semitones(&self) -> (f32, f32) {
        (
            self.osc1_pitch * PITCH_RANGE_SEMITONES,
            self.osc2_pitch * PITCH_RANGE_SEMITONES,
        )
    }

    /// Pulse-width offsets for (osc1, osc2).
    pub fn pwm(&self) -> (f32, f32) {
        (self.osc1_pwm * PWM_RANGE, self.osc2_pwm * PWM_RANGE)
    }

    /// Cutoff multiplier.
    pub fn cutoff_scale(&self) -> f32 {
        2.0_f32.powf(self.filter_cutoff * CUTOFF_RANGE_OCTAVES)
    }

    pub fn amplitude_gain(&self) -> f32 {
        (1.0 + self.amplitude).clamp(0.0, 2.0)
    }

    /// Rate multiplier for every LFO.
    pub fn lfo_rate_scales(&self) -> [f32; MAX_LFO] {
        self.lfo_rate
            .map(|offset| 2.0_f32.powf(offset * LFO_RATE_RANGE_OCTAVES))
    }
}

/// The sixteen-slot routing table.
#[derive(Debug, Clone)]
pub struct ModMatrix {
    slots: [ModSlot; MAX_MOD_SLOTS],
}

impl ModMatrix {
    pub fn new() -> Self {
        Self {
            slots: [ModSlot::EMPTY; MAX_MOD_SLOTS],
        }
    }

    pub fn slots(&self) -> &[ModSlot; MAX_MOD_SLOTS] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&ModSlot> {
        self.slots.get(index)
    }

    /// Replace slot `index`. Returns false when the index is out of range.
    pub fn set_slot(&mut self, index: usize, slot: ModSlot) -> bool {
        match self.slots.get_mut(index) {
            Some(target) => {
                *target = ModSlot::new(slot.source, slot.destination, slot.amount);
                true
            }
            None => false,
        }
    }

    pub fn active_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }

    /// Accumulate every active slot into destination offsets.
    pub fn evaluate(&self, sources: &ModSources) -> ModOffsets {
        let mut offsets = ModOffsets::default();
        for slot in self.slots.iter().filter(|slot| slot.is_active()) {
            let mut value = sources.get(slot.source);
            if slot.destination.is_unipolar() && slot.source.is_bipolar() {
                value = bipolar_to_unipolar(value);
            }
            if let Some(target) = offsets.slot_mut(slot.destination) {
                *target += value * slot.amount;
            }
        }
        offsets.clamp_all();
        offsets
    }

    /// LFO speed multipliers for the next control period. Only global
    /// sources contribute.
    pub fn lfo_rate_scales(&self, sources: &ModSources) -> [f32; MAX_LFO] {
        let mut offsets = ModOffsets::default();
        for slot in self.slots.iter().filter(|slot| slot.is_active()) {
            if let ModDestination::LfoRate(lfo) = slot.destination {
                if slot.source.is_global() {
                    if let Some(target) = offsets.lfo_rate.get_mut(lfo as usize) {
                        *target += sources.get(slot.source) * slot.amount;
                    }
                }
            }
        }
        offsets.clamp_all();
        offsets.lfo_rate_scales()
    }
}

impl Default for ModMatrix {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn clamp_amount(amount: f32) -> f32 {
    if amount.is_nan() {
        0.0
    } else {
        amount.clamp(-1.0, 1.0)
    }
}
