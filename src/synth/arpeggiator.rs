#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rand::Rng;

use crate::dsp::tempo::clamp_tempo;
use crate::synth::message::EventSink;

/*
Arpeggiator
===========

While enabled, held keys are not played directly. The arpeggiator keeps the
set of held notes and plays them one at a time, in order, on a tempo grid.

Vocabulary
----------

  step        One note of the pattern. Steps are spaced one beat / rate
              apart, so rate 2 plays eighth notes at any tempo.

  gate        Fraction of the step the note sounds for (0.05 - 1.0).
              0.8 leaves a short gap between notes.

  octaves     The held chord is repeated this many octaves up before the
              pattern wraps (1 - 4).

  pattern     The held notes in ascending pitch, repeated per octave:

                  held C E G, octaves 2  →  C E G C' E' G'

Modes
-----

  Up        walk the pattern low to high, then wrap
  Down      high to low, then wrap
  UpDown    bounce between the ends without repeating them
  Random    any pattern note, each step

Timing is counted in frames. The engine asks how many frames remain until
the next note-on or note-off, renders up to that point and then polls, so
steps land on exact sample positions.
*/

pub const MAX_HELD_NOTES: usize = 16;
pub const RATE_MULTIPLIERS: [f32; 5] = [0.5, 1.0, 2.0, 3.0, 4.0];
pub const MAX_OCTAVES: u8 = 4;
const MIN_GATE: f32 = 0.05;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArpMode {
    Off,
    #[default]
    Up,
    Down,
    UpDown,
    Random,
}

impl ArpMode {
    pub const ALL: [ArpMode; 5] = [
        ArpMode::Off,
        ArpMode::Up,
        ArpMode::Down,
        ArpMode::UpDown,
        ArpMode::Random,
    ];

    pub fn from_index(index: i32) -> Self {
        let last = Self::ALL.len() as i32 - 1;
        Self::ALL[index.clamp(0, last) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArpSettings {
    pub enabled: bool,
    pub mode: ArpMode,
    /// Steps per beat, one of `RATE_MULTIPLIERS`.
    pub rate: f32,
    pub gate: f32,
    pub octaves: u8,
}

impl Default for ArpSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ArpMode::Up,
            rate: 1.0,
            gate: 0.8,
            octaves: 1,
        }
    }
}

impl ArpSettings {
    /// Whether incoming notes should go through the arpeggiator.
    pub fn is_running(&self) -> bool {
        self.enabled && self.mode != ArpMode::Off
    }
}

/// Snap a rate to the nearest supported multiplier.
pub fn snap_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        return 1.0;
    }
    RATE_MULTIPLIERS
        .iter()
        .copied()
        .min_by(|a, b| (a - rate).abs().total_cmp(&(b - rate).abs()))
        .unwrap_or(1.0)
}

pub fn clamp_gate(gate: f32) -> f32 {
    if gate.is_nan() {
        0.8
    } else {
        gate.clamp(MIN_GATE, 1.0)
    }
}

pub fn clamp_octaves(octaves: i32) -> u8 {
    octaves.clamp(1, MAX_OCTAVES as i32) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpAction {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
}

/// Tempo-grid note player over the held keys.
#[derive(Debug, Clone)]
pub struct Arpeggiator {
    held: [u8; MAX_HELD_NOTES],
    held_len: usize,
    velocity: u8,
    position: Option<usize>,
    ascending: bool,
    sounding: Option<u8>,
    /// Frames until the next step; `None` while no key is held.
    until_step: Option<u64>,
    until_release: Option<u64>,
}

impl Arpeggiator {
    pub fn new() -> Self {
        Self {
            held: [0; MAX_HELD_NOTES],
            held_len: 0,
            velocity: 100,
            position: None,
            ascending: true,
            sounding: None,
            until_step: None,
            until_release: None,
        }
    }

    pub fn held_notes(&self) -> &[u8] {
        &self.held[..self.held_len]
    }

    pub fn sounding(&self) -> Option<u8> {
        self.sounding
    }

    /// Add a held key, kept in ascending order. The first key starts the
    /// pattern on the next poll.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        self.velocity = velocity;
        if self.held_notes().contains(&note) || self.held_len == MAX_HELD_NOTES {
            return;
        }
        let at = self.held_notes().partition_point(|&held| held < note);
        self.held.copy_within(at..self.held_len, at + 1);
        self.held[at] = note;
        self.held_len += 1;

        if self.until_step.is_none() {
            self.position = None;
            self.ascending = true;
            self.until_step = Some(0);
        }
    }

    pub fn note_off(&mut self, note: u8) {
        let Some(at) = self.held_notes().iter().position(|&held| held == note) else {
            return;
        };
        self.held.copy_within(at + 1..self.held_len, at);
        self.held_len -= 1;

        if self.held_len == 0 {
            self.until_step = None;
            self.position = None;
            if self.sounding.is_some() {
                self.until_release = Some(0);
            }
        }
    }

    /// Drop every held key and release the sounding note immediately.
    pub fn clear<S: EventSink<ArpAction> + ?Sized>(&mut self, sink: &mut S) {
        self.held_len = 0;
        self.until_step = None;
        self.until_release = None;
        self.position = None;
        if let Some(note) = self.sounding.take() {
            sink.dispatch(ArpAction::NoteOff { note });
        }
    }

    /// Frames until the next action is due, if any is pending.
    pub fn frames_until_action(&self) -> Option<u64> {
        match (self.until_step, self.until_release) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Count `frames` off the pending timers.
    pub fn advance(&mut self, frames: u64) {
        if let Some(until) = self.until_step.as_mut() {
            *until = until.saturating_sub(frames);
        }
        if let Some(until) = self.until_release.as_mut() {
            *until = until.saturating_sub(frames);
        }
    }

    /// Fire every action that is due now.
    pub fn poll<R: Rng, S: EventSink<ArpAction> + ?Sized>(
        &mut self,
        settings: &ArpSettings,
        sample_rate: f32,
        bpm: f32,
        rng: &mut R,
        sink: &mut S,
    ) {
        if self.until_release == Some(0) {
            self.until_release = None;
            if let Some(note) = self.sounding.take() {
                sink.dispatch(ArpAction::NoteOff { note });
            }
        }

        if self.until_step != Some(0) || self.held_len == 0 {
            return;
        }

        if let Some(note) = self.sounding.take() {
            sink.dispatch(ArpAction::NoteOff { note });
        }

        let note = self.next_note(settings, rng);
        sink.dispatch(ArpAction::NoteOn {
            note,
            velocity: self.velocity,
        });
        self.sounding = Some(note);

        let step = step_frames(settings.rate, sample_rate, bpm);
        let gate = ((step as f32 * clamp_gate(settings.gate)).round() as u64).clamp(1, step);
        self.until_step = Some(step);
        self.until_release = Some(gate);
    }

    fn next_note<R: Rng>(&mut self, settings: &ArpSettings, rng: &mut R) -> u8 {
        let octaves = clamp_octaves(settings.octaves as i32) as usize;
        let len = self.held_len * octaves;
        let last = len - 1;

        let next = match (settings.mode, self.position) {
            (ArpMode::Random, _) => rng.gen_range(0..len),
            (ArpMode::Down, None) => last,
            (ArpMode::Down, Some(pos)) => {
                if pos == 0 || pos > last {
                    last
                } else {
                    pos - 1
                }
            }
            (ArpMode::UpDown, Some(pos)) if len > 1 => {
                let pos = pos.min(last);
                if self.ascending && pos == last {
                    self.ascending = false;
                } else if !self.ascending && pos == 0 {
                    self.ascending = true;
                }
                if self.ascending {
                    pos + 1
                } else {
                    pos - 1
                }
            }
            (_, None) => 0,
            (_, Some(pos)) => (pos + 1) % len,
        };
        self.position = Some(next);

        let base = self.held[next % self.held_len];
        let octave = (next / self.held_len) as u8;
        base.saturating_add(12 * octave).min(127)
    }
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::new()
    }
}

/// Step length in frames: one beat divided by the rate multiplier.
pub fn step_frames(rate: f32, sample_rate: f32, bpm: f32) -> u64 {
    let seconds = 60.0 / clamp_tempo(bpm) / snap_rate(rate);
    ((seconds * sample_rate).round() as u64).max(1)
}
