use rand::Rng;

use crate::dsp::envelope::{Envelope, EnvelopeStage};
use crate::dsp::filter::{FilterMode, SVFilter};
use crate::dsp::lfo::LfoBank;
use crate::dsp::mix::equal_power_pan;
use crate::dsp::oscillator::Oscillator;
use crate::patch::Patch;
use crate::synth::modulation::{ModMatrix, ModOffsets, ModSource, ModSources, CONTROL_PERIOD};

/*
Synth Voice
===========

One voice plays one note:

    osc1 ──┐
           (+) ──► SVF ──► × amp env × mod gain ──► pan ──► L/R
    osc2 ──┘        ▲
     ▲  (sync)      └── cutoff: base, key track, filter env, matrix
     └── osc1 wrap

Three envelopes run per voice (amp, filter, pitch). The amp envelope owns
the voice lifetime: when it reaches Idle the voice is free again.


Control Rate
------------

Pitch, cutoff, resonance, pulse width, gain and pan are recomputed every
CONTROL_PERIOD samples from the modulation matrix. Envelopes and
oscillators run every sample, so the amp envelope never steps.


Pitch
-----

    note    = glide position + bend + pitch_env × pitch_env_amount
    osc1    = note + matrix(osc1 pitch)
    osc2    = note + semitones + fine/100 + matrix(osc2 pitch)
    freq    = 440 × 2^((note - 69) / 12)

Glide moves the position toward the target note at one octave per
`glide_time` seconds.


Filter Cutoff
-------------

    cutoff = base × 2^(key_track × (note - 60) / 12)
           + env_amount × filter_env × 10 kHz

then multiplied by the matrix offset (±5 octaves) and clamped by the
filter to [20 Hz, 0.49 × sample_rate].
*/

/// Filter envelope depth at `env_amount = 1`.
pub const FILTER_ENV_RANGE_HZ: f32 = 10_000.0;
/// Headroom for two summed oscillators.
const OSC_MIX_GAIN: f32 = 0.5;

/// Convert a (fractional) MIDI note number to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn note_to_freq(note: f32) -> f32 {
    440.0 * 2.0_f32.powf((note - 69.0) / 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,      // Available for allocation
    Active,    // Gate held, envelope in attack/decay/sustain
    Releasing, // Key released, envelope in release phase
}

/// Everything outside the voice that rendering reads.
pub struct RenderCtx<'a> {
    pub sample_rate: f32,
    pub patch: &'a Patch,
    pub matrix: &'a ModMatrix,
    pub lfos: &'a LfoBank,
    pub mod_wheel: f32,
    pub aftertouch: f32,
    /// Current pitch-bend offset in semitones.
    pub bend_semitones: f32,
    pub wavetable: &'a [f32],
}

/// Per-period values computed from the matrix.
#[derive(Debug, Clone, Copy)]
struct ControlFrame {
    osc1_hz: f32,
    osc2_hz: f32,
    pwm1: f32,
    pwm2: f32,
    gain: f32,
    pan_left: f32,
    pan_right: f32,
}

pub struct Voice {
    note: u8,
    velocity: f32,
    gate: bool,
    allocation_seq: u64,
    /// Current glide position and destination, as note numbers.
    pitch: f32,
    target_pitch: f32,
    random: f32,
    pan: f32,

    osc1: Oscillator,
    osc2: Oscillator,
    filter: SVFilter,
    amp_env: Envelope,
    filter_env: Envelope,
    pitch_env: Envelope,
}

impl Voice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            note: 0,
            velocity: 0.0,
            gate: false,
            allocation_seq: 0,
            pitch: 60.0,
            target_pitch: 60.0,
            random: 0.0,
            pan: 0.0,
            osc1: Oscillator::default(),
            osc2: Oscillator::default(),
            filter: SVFilter::new(FilterMode::LowPass, sample_rate),
            amp_env: Envelope::new(sample_rate),
            filter_env: Envelope::new(sample_rate),
            pitch_env: Envelope::new(sample_rate),
        }
    }

    /// Copy oscillator, filter and envelope settings from the patch.
    pub fn configure(&mut self, patch: &Patch) {
        for (osc, settings) in [(&mut self.osc1, &patch.osc1), (&mut self.osc2, &patch.osc2)] {
            osc.set_waveform(settings.waveform);
            osc.set_unison(settings.unison as usize);
            osc.set_detune(settings.detune);
            osc.set_pulse_width(settings.pulse_width);
            osc.set_drift(patch.drift);
        }
        self.filter.set_mode(patch.filter_mode);
        self.amp_env.apply_settings(patch.amp_env);
        self.filter_env.apply_settings(patch.filter_env);
        self.pitch_env.apply_settings(patch.pitch_env);
    }

    /// Start a note. `glide_from` is the previous pitch when portamento
    /// should slide into this one.
    pub fn start<R: Rng>(
        &mut self,
        note: u8,
        velocity: u8,
        allocation_seq: u64,
        glide_from: Option<f32>,
        rng: &mut R,
    ) {
        if !self.is_active() {
            self.filter.reset();
        }

        self.note = note;
        self.velocity = velocity.min(127) as f32 / 127.0;
        self.gate = true;
        self.allocation_seq = allocation_seq;
        self.target_pitch = note as f32;
        self.pitch = glide_from.unwrap_or(self.target_pitch);
        self.random = rng.gen_range(-1.0..=1.0);

        self.osc1.retrigger(rng);
        self.osc2.retrigger(rng);
        self.amp_env.note_on(self.velocity);
        self.filter_env.note_on(self.velocity);
        self.pitch_env.note_on(self.velocity);
    }

    /// Take over a sounding voice: force it into release, then retrigger
    /// from wherever the envelopes are.
    pub fn steal<R: Rng>(&mut self, note: u8, velocity: u8, allocation_seq: u64, rng: &mut R) {
        self.force_release();
        self.start(note, velocity, allocation_seq, None, rng);
    }

    /// Legato: move to a new note without retriggering envelopes.
    pub fn glide_to(&mut self, note: u8, allocation_seq: u64, glide: bool) {
        self.note = note;
        self.target_pitch = note as f32;
        self.allocation_seq = allocation_seq;
        self.gate = true;
        if !glide {
            self.pitch = self.target_pitch;
        }
    }

    /// Key up. Ignored unless the gate is held.
    pub fn release(&mut self) {
        if self.gate {
            self.force_release();
        }
    }

    fn force_release(&mut self) {
        self.gate = false;
        self.amp_env.note_off();
        self.filter_env.note_off();
        self.pitch_env.note_off();
    }

    /// Silence immediately.
    pub fn kill(&mut self) {
        self.gate = false;
        self.amp_env.reset();
        self.filter_env.reset();
        self.pitch_env.reset();
        self.filter.reset();
    }

    /// Once-per-block oscillator drift.
    pub fn begin_block<R: Rng>(&mut self, rng: &mut R) {
        if self.is_active() {
            self.osc1.apply_drift(rng);
            self.osc2.apply_drift(rng);
        }
    }

    /// Render and add into `left`/`right`. `block_offset` is the position of
    /// `left[0]` within the engine block, used to read the LFO buffers.
    pub fn render<R: Rng>(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        block_offset: usize,
        ctx: &RenderCtx,
        rng: &mut R,
    ) {
        if !self.is_active() {
            return;
        }

        let frames = left.len().min(right.len());
        let hard_sync = ctx.patch.hard_sync;
        let osc2_level = ctx.patch.osc2_level;

        let mut start = 0;
        while start < frames {
            let end = (start + CONTROL_PERIOD).min(frames);
            let control = self.update_control(block_offset + start, end - start, ctx);

            for i in start..end {
                let amp = self.amp_env.next_sample();
                self.filter_env.next_sample();
                self.pitch_env.next_sample();

                let (s1, wrapped) = self.osc1.next_sample(
                    control.osc1_hz,
                    ctx.sample_rate,
                    control.pwm1,
                    ctx.wavetable,
                    rng,
                );
                if hard_sync && wrapped {
                    self.osc2.sync();
                }
                let (s2, _) = self.osc2.next_sample(
                    control.osc2_hz,
                    ctx.sample_rate,
                    control.pwm2,
                    ctx.wavetable,
                    rng,
                );

                let mixed = (s1 + osc2_level * s2) * OSC_MIX_GAIN;
                let out = self.filter.next_sample(mixed) * amp * control.gain;
                left[i] += out * control.pan_left;
                right[i] += out * control.pan_right;
            }

            if !self.amp_env.is_active() {
                self.kill();
                return;
            }
            start = end;
        }
    }

    fn update_control(&mut self, frame: usize, period: usize, ctx: &RenderCtx) -> ControlFrame {
        let offsets = ctx.matrix.evaluate(&self.sources(frame, ctx));
        let patch = ctx.patch;

        self.advance_glide(period, patch.glide_time, ctx.sample_rate);

        let note = self.pitch
            + ctx.bend_semitones
            + self.pitch_env.level() * patch.pitch_env_amount;
        let (pitch1, pitch2) = offsets.pitch_semitones();
        let osc2_note = note + patch.osc2_semitones as f32 + patch.osc2_fine / 100.0;

        self.filter.set_params(
            self.cutoff_for(patch, &offsets),
            patch.filter_resonance + offsets.filter_resonance,
        );

        let (pwm1, pwm2) = offsets.pwm();
        let (pan_left, pan_right) = equal_power_pan(self.pan + offsets.pan);

        ControlFrame {
            osc1_hz: note_to_freq(note + pitch1),
            osc2_hz: note_to_freq(osc2_note + pitch2),
            pwm1,
            pwm2,
            gain: offsets.amplitude_gain(),
            pan_left,
            pan_right,
        }
    }

    fn sources(&self, frame: usize, ctx: &RenderCtx) -> ModSources {
        let mut sources = ModSources::new();
        sources.set_lfos(ctx.lfos.values_at(frame));
        sources.set(ModSource::ModWheel, ctx.mod_wheel);
        sources.set(ModSource::Aftertouch, ctx.aftertouch);
        sources.set(ModSource::AmpEnvelope, self.amp_env.level());
        sources.set(ModSource::FilterEnvelope, self.filter_env.level());
        sources.set(ModSource::PitchEnvelope, self.pitch_env.level());
        sources.set(ModSource::Velocity, self.velocity);
        sources.set(
            ModSource::KeyTrack,
            ((self.note as f32 - 60.0) / 36.0).clamp(-1.0, 1.0),
        );
        sources.set(ModSource::Random, self.random);
        sources
    }

    fn cutoff_for(&self, patch: &Patch, offsets: &ModOffsets) -> f32 {
        let key = patch.filter_key_track * (self.pitch - 60.0) / 12.0;
        let env = patch.filter_env_amount * self.filter_env.level() * FILTER_ENV_RANGE_HZ;
        (patch.filter_cutoff * 2.0_f32.powf(key) + env) * offsets.cutoff_scale()
    }

    fn advance_glide(&mut self, period: usize, glide_time: f32, sample_rate: f32) {
        if glide_time <= 0.0 || glide_time.is_nan() {
            self.pitch = self.target_pitch;
            return;
        }
        let step = 12.0 * period as f32 / (glide_time * sample_rate);
        let delta = self.target_pitch - self.pitch;
        if delta.abs() <= step {
            self.pitch = self.target_pitch;
        } else {
            self.pitch += step.copysign(delta);
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.filter.set_sample_rate(sample_rate);
        self.amp_env.set_sample_rate(sample_rate);
        self.filter_env.set_sample_rate(sample_rate);
        self.pitch_env.set_sample_rate(sample_rate);
    }

    pub fn state(&self) -> VoiceState {
        match (self.amp_env.stage(), self.gate) {
            (EnvelopeStage::Idle, _) => VoiceState::Idle,
            (_, true) => VoiceState::Active,
            (_, false) => VoiceState::Releasing,
        }
    }

    pub fn is_active(&self) -> bool {
        self.amp_env.is_active()
    }

    pub fn is_idle(&self) -> bool {
        !self.is_active()
    }

    /// Gate held for `note`.
    pub fn is_holding(&self, note: u8) -> bool {
        self.gate && self.note == note && self.is_active()
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn allocation_seq(&self) -> u64 {
        self.allocation_seq
    }

    /// Current glide position as a note number.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn amp_level(&self) -> f32 {
        self.amp_env.level()
    }

    pub fn amp_envelope(&self) -> &Envelope {
        &self.amp_env
    }

    /// Cutoff currently in effect, after modulation and clamping.
    pub fn filter_cutoff(&self) -> f32 {
        self.filter.cutoff()
    }

    pub fn osc1(&self) -> &Oscillator {
        &self.osc1
    }

    pub fn osc2(&self) -> &Oscillator {
        &self.osc2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::filter::MIN_CUTOFF_HZ;
    use crate::synth::modulation::{ModDestination, ModSlot};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    const SR: f32 = 48_000.0;

    struct Fixture {
        patch: Patch,
        matrix: ModMatrix,
        lfos: LfoBank,
        rng: SmallRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                patch: Patch::default(),
                matrix: ModMatrix::new(),
                lfos: LfoBank::new(),
                rng: SmallRng::seed_from_u64(3),
            }
        }

        fn render(&mut self, voice: &mut Voice, frames: usize) -> (Vec<f32>, Vec<f32>) {
            let mut left = vec![0.0; frames];
            let mut right = vec![0.0; frames];
            let ctx = RenderCtx {
                sample_rate: SR,
                patch: &self.patch,
                matrix: &self.matrix,
                lfos: &self.lfos,
                mod_wheel: 0.0,
                aftertouch: 0.0,
                bend_semitones: 0.0,
                wavetable: &[],
            };
            voice.render(&mut left, &mut right, 0, &ctx, &mut self.rng);
            (left, right)
        }
    }

    #[test]
    fn test_voice_lifecycle() {
        let mut fx = Fixture::new();
        let mut voice = Voice::new(SR);
        voice.configure(&fx.patch);
        assert_eq!(voice.state(), VoiceState::Idle);

        voice.start(60, 100, 1, None, &mut fx.rng);
        assert_eq!(voice.state(), VoiceState::Active);
        let (left, _) = fx.render(&mut voice, 1024);
        assert!(left.iter().any(|s| s.abs() > 1e-4));

        voice.release();
        assert_eq!(voice.state(), VoiceState::Releasing);
        let release = (fx.patch.amp_env.release * SR) as usize + 64;
        fx.render(&mut voice, release);
        assert_eq!(voice.state(), VoiceState::Idle);

        let (left, right) = fx.render(&mut voice, 64);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0));
    }

    #[test]
    fn test_release_ignored_without_gate() {
        let mut fx = Fixture::new();
        let mut voice = Voice::new(SR);
        voice.release();
        assert_eq!(voice.state(), VoiceState::Idle);

        voice.start(64, 90, 1, None, &mut fx.rng);
        voice.release();
        voice.release();
        assert_eq!(voice.state(), VoiceState::Releasing);
    }

    #[test]
    fn test_glide_reaches_target() {
        let mut fx = Fixture::new();
        fx.patch.glide_time = 0.1;
        let mut voice = Voice::new(SR);
        voice.configure(&fx.patch);
        voice.start(72, 100, 1, Some(60.0), &mut fx.rng);
        assert_eq!(voice.pitch(), 60.0);

        fx.render(&mut voice, 1200);
        assert!(voice.pitch() > 60.0 && voice.pitch() < 72.0);

        // One octave per 0.1 s
        fx.render(&mut voice, 4800);
        assert_eq!(voice.pitch(), 72.0);
    }

    #[test]
    fn test_modulated_cutoff_stays_in_range() {
        let mut fx = Fixture::new();
        fx.patch.filter_cutoff = 20_000.0;
        fx.patch.filter_env_amount = 1.0;
        fx.matrix
            .set_slot(0, ModSlot::new(ModSource::Velocity, ModDestination::FilterCutoff, 1.0));
        let mut voice = Voice::new(SR);
        voice.configure(&fx.patch);
        voice.start(127, 127, 1, None, &mut fx.rng);
        for _ in 0..20 {
            let (left, _) = fx.render(&mut voice, 256);
            assert!(voice.filter_cutoff() <= 0.49 * SR);
            assert!(left.iter().all(|s| s.is_finite()));
        }

        fx.patch.filter_cutoff = -100.0;
        fx.patch.filter_env_amount = 0.0;
        fx.matrix
            .set_slot(0, ModSlot::new(ModSource::Velocity, ModDestination::FilterCutoff, -1.0));
        fx.render(&mut voice, 256);
        assert_eq!(voice.filter_cutoff(), MIN_CUTOFF_HZ);
    }

    #[test]
    fn test_pan_modulation_moves_image() {
        let mut fx = Fixture::new();
        fx.matrix
            .set_slot(0, ModSlot::new(ModSource::Velocity, ModDestination::Pan, -1.0));
        let mut voice = Voice::new(SR);
        voice.configure(&fx.patch);
        voice.start(60, 127, 1, None, &mut fx.rng);
        let (left, right) = fx.render(&mut voice, 2048);
        let energy = |buf: &[f32]| buf.iter().map(|s| s * s).sum::<f32>();
        assert!(energy(&left) > 100.0 * energy(&right).max(1e-12));
    }

    #[test]
    fn test_note_to_freq() {
        assert!((note_to_freq(69.0) - 440.0).abs() < 1e-3);
        assert!((note_to_freq(81.0) - 880.0).abs() < 1e-2);
    }
}
