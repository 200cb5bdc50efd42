#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rand::Rng;

use crate::patch::Patch;
use crate::synth::voice::{RenderCtx, Voice, VoiceState};
use crate::MAX_VOICES;

/*
Voice Allocation
================

The pool holds a fixed eight voices, addressed by index. Only the allocator
changes which note a voice plays.

Poly Mode
---------

  1. Free voice available: take the next Idle voice at or after the
     round-robin cursor, then move the cursor past it. Rotating spreads
     consecutive notes across voices so a release tail is not cut short by
     the very next note.

  2. No free voice: steal the voice with the smallest allocation sequence
     number (the one started longest ago). It is forced into release and
     immediately retriggered for the new note. The single-sample jump this
     causes is accepted.

A note number that is already sounding gets a fresh voice; the older voice
keeps ringing until its own note-off.

Note-off releases every voice holding that note. A note-off for a note that
is not held does nothing.

Mono / Legato
-------------

Only voice 0 plays. Mono retriggers envelopes on every note. Legato keeps
the envelopes running while a key is held and only moves the pitch, so
overlapping notes slur into each other. Releasing the newest key falls back
to the most recent key still held.
*/

/// Keys remembered for mono fallback.
const KEY_STACK: usize = 16;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceMode {
    #[default]
    Poly,
    Mono,
    Legato,
}

impl VoiceMode {
    pub const ALL: [VoiceMode; 3] = [VoiceMode::Poly, VoiceMode::Mono, VoiceMode::Legato];

    pub fn from_index(index: i32) -> Self {
        let last = Self::ALL.len() as i32 - 1;
        Self::ALL[index.clamp(0, last) as usize]
    }

    pub fn index(self) -> i32 {
        self as i32
    }
}

pub struct VoiceAllocator {
    voices: [Voice; MAX_VOICES],
    mode: VoiceMode,
    cursor: usize,
    next_seq: u64,
    /// Pitch of the most recent note, for portamento.
    last_pitch: Option<f32>,
    held: [u8; KEY_STACK],
    held_len: usize,
}

impl VoiceAllocator {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: std::array::from_fn(|_| Voice::new(sample_rate)),
            mode: VoiceMode::Poly,
            cursor: 0,
            next_seq: 0,
            last_pitch: None,
            held: [0; KEY_STACK],
            held_len: 0,
        }
    }

    pub fn configure(&mut self, patch: &Patch) {
        if patch.voice_mode != self.mode {
            self.set_mode(patch.voice_mode);
        }
        for voice in &mut self.voices {
            voice.configure(patch);
        }
    }

    /// Switching modes releases everything so no voice is left orphaned.
    pub fn set_mode(&mut self, mode: VoiceMode) {
        self.all_notes_off();
        self.mode = mode;
    }

    pub fn mode(&self) -> VoiceMode {
        self.mode
    }

    /// Start a note. Returns the index of the voice that plays it.
    pub fn note_on<R: Rng>(&mut self, note: u8, velocity: u8, glide: bool, rng: &mut R) -> usize {
        let seq = self.next_seq;
        self.next_seq += 1;
        let glide_from = if glide { self.last_pitch } else { None };
        self.last_pitch = Some(note as f32);

        match self.mode {
            VoiceMode::Poly => {
                let index = match self.find_idle() {
                    Some(index) => {
                        self.voices[index].start(note, velocity, seq, glide_from, rng);
                        index
                    }
                    None => {
                        let index = self.oldest();
                        self.voices[index].steal(note, velocity, seq, rng);
                        index
                    }
                };
                self.cursor = (index + 1) % MAX_VOICES;
                index
            }
            VoiceMode::Mono | VoiceMode::Legato => {
                self.push_key(note);
                let voice = &mut self.voices[0];
                let legato = self.mode == VoiceMode::Legato && voice.state() == VoiceState::Active;
                if legato {
                    voice.glide_to(note, seq, glide);
                } else {
                    voice.start(note, velocity, seq, glide_from, rng);
                }
                0
            }
        }
    }

    /// Release every voice holding `note`. No-op when none is.
    pub fn note_off(&mut self, note: u8) {
        match self.mode {
            VoiceMode::Poly => {
                for voice in self.voices.iter_mut().filter(|v| v.is_holding(note)) {
                    voice.release();
                }
            }
            VoiceMode::Mono | VoiceMode::Legato => {
                let was_top = self.top_key() == Some(note);
                self.remove_key(note);
                if !was_top {
                    return;
                }
                let seq = self.next_seq;
                match self.top_key() {
                    Some(previous) => {
                        self.next_seq += 1;
                        self.last_pitch = Some(previous as f32);
                        self.voices[0].glide_to(previous, seq, true);
                    }
                    None => self.voices[0].release(),
                }
            }
        }
    }

    /// Release every sounding voice.
    pub fn all_notes_off(&mut self) {
        self.held_len = 0;
        for voice in &mut self.voices {
            voice.release();
        }
    }

    pub fn begin_block<R: Rng>(&mut self, rng: &mut R) {
        for voice in &mut self.voices {
            voice.begin_block(rng);
        }
    }

    /// Render every active voice, summed into `left`/`right`.
    pub fn render<R: Rng>(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        block_offset: usize,
        ctx: &RenderCtx,
        rng: &mut R,
    ) {
        for voice in self.voices.iter_mut().filter(|v| v.is_active()) {
            voice.render(left, right, block_offset, ctx, rng);
        }
    }

    pub fn voices(&self) -> &[Voice; MAX_VOICES] {
        &self.voices
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for voice in &mut self.voices {
            voice.set_sample_rate(sample_rate);
        }
    }

    fn find_idle(&self) -> Option<usize> {
        (0..MAX_VOICES)
            .map(|offset| (self.cursor + offset) % MAX_VOICES)
            .find(|&index| self.voices[index].is_idle())
    }

    fn oldest(&self) -> usize {
        self.voices
            .iter()
            .enumerate()
            .min_by_key(|(_, voice)| voice.allocation_seq())
            .map_or(0, |(index, _)| index)
    }

    fn top_key(&self) -> Option<u8> {
        self.held[..self.held_len].last().copied()
    }

    fn push_key(&mut self, note: u8) {
        self.remove_key(note);
        if self.held_len == KEY_STACK {
            self.held.copy_within(1.., 0);
            self.held_len -= 1;
        }
        self.held[self.held_len] = note;
        self.held_len += 1;
    }

    fn remove_key(&mut self, note: u8) {
        if let Some(at) = self.held[..self.held_len].iter().position(|&k| k == note) {
            self.held.copy_within(at + 1..self.held_len, at);
            self.held_len -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn allocator() -> (VoiceAllocator, SmallRng) {
        let mut alloc = VoiceAllocator::new(48_000.0);
        alloc.configure(&Patch::default());
        (alloc, SmallRng::seed_from_u64(11))
    }

    #[test]
    fn test_round_robin_over_idle_voices() {
        let (mut alloc, mut rng) = allocator();
        assert_eq!(alloc.note_on(60, 100, false, &mut rng), 0);
        assert_eq!(alloc.note_on(62, 100, false, &mut rng), 1);
        alloc.note_off(60);
        // Voice 0 is releasing, not idle; the cursor keeps moving forward
        assert_eq!(alloc.note_on(64, 100, false, &mut rng), 2);
    }

    #[test]
    fn test_ninth_note_steals_oldest() {
        let (mut alloc, mut rng) = allocator();
        for note in 60..68 {
            alloc.note_on(note, 100, false, &mut rng);
        }
        assert_eq!(alloc.active_voices(), 8);

        let index = alloc.note_on(80, 100, false, &mut rng);
        assert_eq!(index, 0, "voice that played note 60 is the oldest");
        assert_eq!(alloc.voices()[0].note(), 80);
        assert_eq!(alloc.active_voices(), 8);

        let index = alloc.note_on(81, 100, false, &mut rng);
        assert_eq!(index, 1);
    }

    #[test]
    fn test_note_off_unknown_note_is_noop() {
        let (mut alloc, mut rng) = allocator();
        alloc.note_on(60, 100, false, &mut rng);
        alloc.note_off(61);
        assert_eq!(alloc.voices()[0].state(), VoiceState::Active);
    }

    #[test]
    fn test_repeated_note_gets_new_voice() {
        let (mut alloc, mut rng) = allocator();
        let a = alloc.note_on(60, 100, false, &mut rng);
        let b = alloc.note_on(60, 100, false, &mut rng);
        assert_ne!(a, b);
        alloc.note_off(60);
        assert_eq!(alloc.voices()[a].state(), VoiceState::Releasing);
        assert_eq!(alloc.voices()[b].state(), VoiceState::Releasing);
    }

    #[test]
    fn test_all_notes_off_releases_everything() {
        let (mut alloc, mut rng) = allocator();
        for note in 60..64 {
            alloc.note_on(note, 100, false, &mut rng);
        }
        alloc.all_notes_off();
        assert!(alloc
            .voices()
            .iter()
            .filter(|v| v.is_active())
            .all(|v| v.state() == VoiceState::Releasing));
    }

    #[test]
    fn test_mono_uses_voice_zero_and_falls_back() {
        let (mut alloc, mut rng) = allocator();
        alloc.set_mode(VoiceMode::Mono);
        assert_eq!(alloc.note_on(60, 100, false, &mut rng), 0);
        assert_eq!(alloc.note_on(67, 100, false, &mut rng), 0);
        assert_eq!(alloc.active_voices(), 1);

        alloc.note_off(67);
        assert_eq!(alloc.voices()[0].note(), 60);
        assert_eq!(alloc.voices()[0].state(), VoiceState::Active);

        alloc.note_off(60);
        assert_eq!(alloc.voices()[0].state(), VoiceState::Releasing);
    }

    #[test]
    fn test_legato_keeps_envelope_running() {
        let (mut alloc, mut rng) = allocator();
        alloc.set_mode(VoiceMode::Legato);
        alloc.note_on(60, 100, false, &mut rng);
        let seq_before = alloc.voices()[0].allocation_seq();
        alloc.note_on(64, 100, false, &mut rng);
        let voice = &alloc.voices()[0];
        assert_eq!(voice.note(), 64);
        assert_eq!(voice.pitch(), 64.0);
        assert!(voice.allocation_seq() > seq_before);
        assert_eq!(
            voice.amp_envelope().stage(),
            crate::dsp::EnvelopeStage::Attack,
            "legato does not restart the attack"
        );
    }
}
