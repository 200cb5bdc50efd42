#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::envelope::AdsrSettings;
use crate::dsp::filter::FilterMode;
use crate::dsp::lfo::{LfoSettings, LfoWaveform, MAX_LFO_RATE, MIN_LFO_RATE};
use crate::dsp::oscillator::{Waveform, MAX_DETUNE_CENTS, PULSE_WIDTH_RANGE};
use crate::dsp::tempo::{clamp_tempo, NoteDivision, DEFAULT_TEMPO};
use crate::effects::EffectsSettings;
use crate::synth::allocator::VoiceMode;
use crate::synth::arpeggiator::{clamp_gate, clamp_octaves, snap_rate, ArpMode, ArpSettings};
use crate::synth::message::{ParamId, ParamMsg, ParamValue};
use crate::synth::modulation::{ModDestination, ModSlot, ModSource};
use crate::{MAX_LFO, MAX_MOD_SLOTS, MAX_UNISON};

/*
Patch
=====

A patch is the complete, flat record of every control value: the sound
the engine makes is a pure function of the patch plus the notes played.

Every ParamMsg the engine receives is applied here first. `apply` clamps
the value into the parameter's legal range (enum indices clamp to the
nearest variant), so nothing downstream ever sees an out-of-range setting.
`get` reads a value back in the same form a control surface would send it,
and `to_messages` turns the whole patch into the message list that
reproduces it on a running engine.

    field                 range
    master volume         0 .. 1
    filter cutoff         20 .. 20000 Hz
    resonance             0 .. 1
    filter env amount     -1 .. 1
    attack / decay        0.001 .. 2 s
    sustain               0 .. 1
    release               0.001 .. 5 s
    glide                 0 .. 5 s per octave
    LFO rate              0.01 .. 50 Hz
    delay time            0.05 .. 2 s
    reverb size           0.1 .. 0.95
    compressor ratio      1 .. 20
*/

const ATTACK_RANGE: (f32, f32) = (0.001, 2.0);
const DECAY_RANGE: (f32, f32) = (0.001, 2.0);
const RELEASE_RANGE: (f32, f32) = (0.001, 5.0);
const CUTOFF_RANGE: (f32, f32) = (20.0, 20_000.0);
const GLIDE_RANGE: (f32, f32) = (0.0, 5.0);
const PITCH_ENV_RANGE: (f32, f32) = (-24.0, 24.0);
const FADE_IN_RANGE: (f32, f32) = (0.0, 10.0);
const DELAY_TIME_RANGE: (f32, f32) = (0.05, 2.0);
const REVERB_SIZE_RANGE: (f32, f32) = (0.1, 0.95);

/// Which part of the engine a parameter change touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamGroup {
    Global,
    Voice,
    Lfo,
    Matrix,
    Effects,
    Arp,
}

impl ParamId {
    pub fn group(self) -> ParamGroup {
        use ParamId::*;
        match self {
            MasterVolume | Tempo | Panic => ParamGroup::Global,
            LfoWaveform(_) | LfoRate(_) | LfoSync(_) | LfoDepth(_) | LfoKeySync(_)
            | LfoFadeIn(_) => ParamGroup::Lfo,
            ModSource(_) | ModDestination(_) | ModAmount(_) => ParamGroup::Matrix,
            DistortionEnabled | DistortionDrive | DistortionMix | ChorusEnabled | ChorusRate
            | ChorusDepth | ChorusMix | DelayEnabled | DelayTime | DelaySync | DelayFeedback
            | DelayTone | DelayMix | ReverbEnabled | ReverbSize | ReverbDamping | ReverbMix
            | CompressorEnabled | CompressorThreshold | CompressorRatio | CompressorAttack
            | CompressorRelease | CompressorMakeup => ParamGroup::Effects,
            ArpEnabled | ArpMode | ArpRate | ArpGate | ArpOctaves => ParamGroup::Arp,
            _ => ParamGroup::Voice,
        }
    }
}

/// Every stored parameter, in the order `to_messages` emits them.
pub fn param_ids() -> impl Iterator<Item = ParamId> {
    use ParamId::*;
    #[rustfmt::skip]
    const FIXED: [ParamId; 73] = [
        MasterVolume, Tempo,
        Osc1Waveform, Osc1Unison, Osc1Detune, Osc1PulseWidth,
        Osc2Waveform, Osc2Unison, Osc2Detune, Osc2PulseWidth,
        Osc2Level, Osc2Semitones, Osc2Fine, HardSync, Drift,
        FilterMode, FilterCutoff, FilterResonance, FilterKeyTrack, FilterEnvAmount,
        AmpAttack, AmpDecay, AmpSustain, AmpRelease, AmpVelocity,
        AmpRetrigger, AmpLoop,
        FilterEnvAttack, FilterEnvDecay, FilterEnvSustain, FilterEnvRelease, FilterEnvVelocity,
        FilterEnvRetrigger, FilterEnvLoop,
        PitchEnvAttack, PitchEnvDecay, PitchEnvSustain, PitchEnvRelease, PitchEnvVelocity,
        PitchEnvRetrigger, PitchEnvLoop,
        PitchEnvAmount,
        VoiceMode, GlideTime, PitchBendRange,
        DistortionEnabled, DistortionDrive, DistortionMix,
        ChorusEnabled, ChorusRate, ChorusDepth, ChorusMix,
        DelayEnabled, DelayTime, DelaySync, DelayFeedback, DelayTone, DelayMix,
        ReverbEnabled, ReverbSize, ReverbDamping, ReverbMix,
        CompressorEnabled, CompressorThreshold, CompressorRatio, CompressorAttack,
        CompressorRelease, CompressorMakeup,
        ArpEnabled, ArpMode, ArpRate, ArpGate, ArpOctaves,
    ];

    let lfo = (0..MAX_LFO as u8).flat_map(|i| {
        [
            LfoWaveform(i),
            LfoRate(i),
            LfoSync(i),
            LfoDepth(i),
            LfoKeySync(i),
            LfoFadeIn(i),
        ]
    });
    let matrix = (0..MAX_MOD_SLOTS as u8)
        .flat_map(|i| [ModSource(i), ModDestination(i), ModAmount(i)]);

    FIXED.into_iter().chain(lfo).chain(matrix)
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorSettings {
    pub waveform: Waveform,
    pub unison: u8,
    /// Unison spread in cents.
    pub detune: f32,
    pub pulse_width: f32,
}

impl Default for OscillatorSettings {
    fn default() -> Self {
        Self {
            waveform: Waveform::Saw,
            unison: 1,
            detune: 0.0,
            pulse_width: 0.5,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub name: String,

    pub master_volume: f32,
    pub tempo: f32,

    pub osc1: OscillatorSettings,
    pub osc2: OscillatorSettings,
    pub osc2_level: f32,
    pub osc2_semitones: i32,
    /// Osc2 fine tune in cents.
    pub osc2_fine: f32,
    pub hard_sync: bool,
    pub drift: f32,

    pub filter_mode: FilterMode,
    pub filter_cutoff: f32,
    pub filter_resonance: f32,
    pub filter_key_track: f32,
    pub filter_env_amount: f32,

    pub amp_env: AdsrSettings,
    pub filter_env: AdsrSettings,
    pub pitch_env: AdsrSettings,
    /// Pitch envelope depth in semitones.
    pub pitch_env_amount: f32,

    pub voice_mode: VoiceMode,
    /// Portamento speed in seconds per octave; 0 disables glide.
    pub glide_time: f32,
    pub pitch_bend_range: i32,

    pub lfos: [LfoSettings; MAX_LFO],
    pub mod_slots: [ModSlot; MAX_MOD_SLOTS],
    pub effects: EffectsSettings,
    pub arp: ArpSettings,
}

impl Default for Patch {
    fn default() -> Self {
        let mut amp_env = AdsrSettings::new(0.01, 0.1, 0.7, 0.3);
        amp_env.velocity_sensitivity = 1.0;

        Self {
            name: "Init".to_string(),
            master_volume: 0.7,
            tempo: DEFAULT_TEMPO,
            osc1: OscillatorSettings::default(),
            osc2: OscillatorSettings::default(),
            osc2_level: 0.5,
            osc2_semitones: 0,
            osc2_fine: 0.0,
            hard_sync: false,
            drift: 0.0,
            filter_mode: FilterMode::LowPass,
            filter_cutoff: 8_000.0,
            filter_resonance: 0.3,
            filter_key_track: 0.0,
            filter_env_amount: 0.0,
            amp_env,
            filter_env: AdsrSettings::new(0.01, 0.3, 0.3, 0.3),
            pitch_env: AdsrSettings::new(0.001, 0.1, 0.0, 0.1),
            pitch_env_amount: 0.0,
            voice_mode: VoiceMode::Poly,
            glide_time: 0.0,
            pitch_bend_range: 2,
            lfos: [LfoSettings::default(); MAX_LFO],
            mod_slots: [ModSlot::EMPTY; MAX_MOD_SLOTS],
            effects: EffectsSettings::default(),
            arp: ArpSettings::default(),
        }
    }
}

impl Patch {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Store a parameter change, clamped into range. Returns false for
    /// messages that carry no patch state (panic, out-of-range indices).
    pub fn apply(&mut self, msg: ParamMsg) -> bool {
        let v = msg.value;
        match msg.id {
            ParamId::Panic => return false,
            ParamId::MasterVolume => self.master_volume = unit(v),
            ParamId::Tempo => self.tempo = clamp_tempo(v.as_float()),

            ParamId::Osc1Waveform => self.osc1.waveform = Waveform::from_index(v.as_int()),
            ParamId::Osc1Unison => self.osc1.unison = unison(v),
            ParamId::Osc1Detune => self.osc1.detune = ranged(v, (0.0, MAX_DETUNE_CENTS)),
            ParamId::Osc1PulseWidth => self.osc1.pulse_width = ranged(v, PULSE_WIDTH_RANGE),
            ParamId::Osc2Waveform => self.osc2.waveform = Waveform::from_index(v.as_int()),
            ParamId::Osc2Unison => self.osc2.unison = unison(v),
            ParamId::Osc2Detune => self.osc2.detune = ranged(v, (0.0, MAX_DETUNE_CENTS)),
            ParamId::Osc2PulseWidth => self.osc2.pulse_width = ranged(v, PULSE_WIDTH_RANGE),
            ParamId::Osc2Level => self.osc2_level = unit(v),
            ParamId::Osc2Semitones => self.osc2_semitones = v.as_int().clamp(-24, 24),
            ParamId::Osc2Fine => self.osc2_fine = ranged(v, (-100.0, 100.0)),
            ParamId::HardSync => self.hard_sync = v.as_bool(),
            ParamId::Drift => self.drift = unit(v),

            ParamId::FilterMode => self.filter_mode = FilterMode::from_index(v.as_int()),
            ParamId::FilterCutoff => self.filter_cutoff = ranged(v, CUTOFF_RANGE),
            ParamId::FilterResonance => self.filter_resonance = unit(v),
            ParamId::FilterKeyTrack => self.filter_key_track = unit(v),
            ParamId::FilterEnvAmount => self.filter_env_amount = ranged(v, (-1.0, 1.0)),

            ParamId::AmpAttack => self.amp_env.attack = ranged(v, ATTACK_RANGE),
            ParamId::AmpDecay => self.amp_env.decay = ranged(v, DECAY_RANGE),
            ParamId::AmpSustain => self.amp_env.sustain = unit(v),
            ParamId::AmpRelease => self.amp_env.release = ranged(v, RELEASE_RANGE),
            ParamId::AmpVelocity => self.amp_env.velocity_sensitivity = unit(v),
            ParamId::AmpRetrigger => self.amp_env.retrigger = v.as_bool(),
            ParamId::AmpLoop => self.amp_env.looping = v.as_bool(),
            ParamId::FilterEnvAttack => self.filter_env.attack = ranged(v, ATTACK_RANGE),
            ParamId::FilterEnvDecay => self.filter_env.decay = ranged(v, DECAY_RANGE),
            ParamId::FilterEnvSustain => self.filter_env.sustain = unit(v),
            ParamId::FilterEnvRelease => self.filter_env.release = ranged(v, RELEASE_RANGE),
            ParamId::FilterEnvVelocity => self.filter_env.velocity_sensitivity = unit(v),
            ParamId::FilterEnvRetrigger => self.filter_env.retrigger = v.as_bool(),
            ParamId::FilterEnvLoop => self.filter_env.looping = v.as_bool(),
            ParamId::PitchEnvAttack => self.pitch_env.attack = ranged(v, ATTACK_RANGE),
            ParamId::PitchEnvDecay => self.pitch_env.decay = ranged(v, DECAY_RANGE),
            ParamId::PitchEnvSustain => self.pitch_env.sustain = unit(v),
            ParamId::PitchEnvRelease => self.pitch_env.release = ranged(v, RELEASE_RANGE),
            ParamId::PitchEnvVelocity => self.pitch_env.velocity_sensitivity = unit(v),
            ParamId::PitchEnvRetrigger => self.pitch_env.retrigger = v.as_bool(),
            ParamId::PitchEnvLoop => self.pitch_env.looping = v.as_bool(),
            ParamId::PitchEnvAmount => self.pitch_env_amount = ranged(v, PITCH_ENV_RANGE),

            ParamId::VoiceMode => self.voice_mode = VoiceMode::from_index(v.as_int()),
            ParamId::GlideTime => self.glide_time = ranged(v, GLIDE_RANGE),
            ParamId::PitchBendRange => self.pitch_bend_range = v.as_int().clamp(0, 24),

            ParamId::LfoWaveform(i) => match self.lfos.get_mut(i as usize) {
                Some(lfo) => lfo.waveform = LfoWaveform::from_index(v.as_int()),
                None => return false,
            },
            ParamId::LfoRate(i) => match self.lfos.get_mut(i as usize) {
                Some(lfo) => lfo.rate_hz = ranged(v, (MIN_LFO_RATE, MAX_LFO_RATE)),
                None => return false,
            },
            ParamId::LfoSync(i) => match self.lfos.get_mut(i as usize) {
                Some(lfo) => lfo.sync = NoteDivision::from_index(v.as_int()),
                None => return false,
            },
            ParamId::LfoDepth(i) => match self.lfos.get_mut(i as usize) {
                Some(lfo) => lfo.depth = unit(v),
                None => return false,
            },
            ParamId::LfoKeySync(i) => match self.lfos.get_mut(i as usize) {
                Some(lfo) => lfo.key_sync = v.as_bool(),
                None => return false,
            },
            ParamId::LfoFadeIn(i) => match self.lfos.get_mut(i as usize) {
                Some(lfo) => lfo.fade_in = ranged(v, FADE_IN_RANGE),
                None => return false,
            },

            ParamId::ModSource(i) => match self.mod_slots.get_mut(i as usize) {
                Some(slot) => slot.source = ModSource::from_index(v.as_int()),
                None => return false,
            },
            ParamId::ModDestination(i) => match self.mod_slots.get_mut(i as usize) {
                Some(slot) => slot.destination = ModDestination::from_index(v.as_int()),
                None => return false,
            },
            ParamId::ModAmount(i) => match self.mod_slots.get_mut(i as usize) {
                Some(slot) => slot.amount = ranged(v, (-1.0, 1.0)),
                None => return false,
            },

            ParamId::DistortionEnabled => self.effects.distortion.enabled = v.as_bool(),
            ParamId::DistortionDrive => self.effects.distortion.drive = ranged(v, (1.0, 20.0)),
            ParamId::DistortionMix => self.effects.distortion.mix = unit(v),
            ParamId::ChorusEnabled => self.effects.chorus.enabled = v.as_bool(),
            ParamId::ChorusRate => self.effects.chorus.rate = ranged(v, (0.1, 5.0)),
            ParamId::ChorusDepth => self.effects.chorus.depth = ranged(v, (0.5, 10.0)),
            ParamId::ChorusMix => self.effects.chorus.mix = unit(v),
            ParamId::DelayEnabled => self.effects.delay.enabled = v.as_bool(),
            ParamId::DelayTime => self.effects.delay.time = ranged(v, DELAY_TIME_RANGE),
            ParamId::DelaySync => self.effects.delay.sync = NoteDivision::from_index(v.as_int()),
            ParamId::DelayFeedback => self.effects.delay.feedback = ranged(v, (0.0, 0.99)),
            ParamId::DelayTone => self.effects.delay.tone = unit(v),
            ParamId::DelayMix => self.effects.delay.mix = unit(v),
            ParamId::ReverbEnabled => self.effects.reverb.enabled = v.as_bool(),
            ParamId::ReverbSize => self.effects.reverb.size = ranged(v, REVERB_SIZE_RANGE),
            ParamId::ReverbDamping => self.effects.reverb.damping = ranged(v, (0.0, 0.99)),
            ParamId::ReverbMix => self.effects.reverb.mix = unit(v),
            ParamId::CompressorEnabled => self.effects.compressor.enabled = v.as_bool(),
            ParamId::CompressorThreshold => {
                self.effects.compressor.threshold = ranged(v, (0.01, 1.0))
            }
            ParamId::CompressorRatio => self.effects.compressor.ratio = ranged(v, (1.0, 20.0)),
            ParamId::CompressorAttack => {
                self.effects.compressor.attack = ranged(v, (0.0005, 0.5))
            }
            ParamId::CompressorRelease => {
                self.effects.compressor.release = ranged(v, (0.01, 2.0))
            }
            ParamId::CompressorMakeup => self.effects.compressor.makeup = ranged(v, (0.0, 2.0)),

            ParamId::ArpEnabled => self.arp.enabled = v.as_bool(),
            ParamId::ArpMode => self.arp.mode = ArpMode::from_index(v.as_int()),
            ParamId::ArpRate => self.arp.rate = snap_rate(v.as_float()),
            ParamId::ArpGate => self.arp.gate = clamp_gate(v.as_float()),
            ParamId::ArpOctaves => self.arp.octaves = clamp_octaves(v.as_int()),
        }
        true
    }

    /// Read a parameter back. Indexed parameters out of range, and the
    /// stateless panic trigger, read as `Float(0.0)`.
    pub fn get(&self, id: ParamId) -> ParamValue {
        let fx = &self.effects;
        let lfo = |i: u8| self.lfos.get(i as usize);
        let slot = |i: u8| self.mod_slots.get(i as usize);

        let value: Option<ParamValue> = match id {
            ParamId::Panic => None,
            ParamId::MasterVolume => Some(self.master_volume.into()),
            ParamId::Tempo => Some(self.tempo.into()),

            ParamId::Osc1Waveform => Some(self.osc1.waveform.index().into()),
            ParamId::Osc1Unison => Some((self.osc1.unison as i32).into()),
            ParamId::Osc1Detune => Some(self.osc1.detune.into()),
            ParamId::Osc1PulseWidth => Some(self.osc1.pulse_width.into()),
            ParamId::Osc2Waveform => Some(self.osc2.waveform.index().into()),
            ParamId::Osc2Unison => Some((self.osc2.unison as i32).into()),
            ParamId::Osc2Detune => Some(self.osc2.detune.into()),
            ParamId::Osc2PulseWidth => Some(self.osc2.pulse_width.into()),
            ParamId::Osc2Level => Some(self.osc2_level.into()),
            ParamId::Osc2Semitones => Some(self.osc2_semitones.into()),
            ParamId::Osc2Fine => Some(self.osc2_fine.into()),
            ParamId::HardSync => Some(self.hard_sync.into()),
            ParamId::Drift => Some(self.drift.into()),

            ParamId::FilterMode => Some(self.filter_mode.index().into()),
            ParamId::FilterCutoff => Some(self.filter_cutoff.into()),
            ParamId::FilterResonance => Some(self.filter_resonance.into()),
            ParamId::FilterKeyTrack => Some(self.filter_key_track.into()),
            ParamId::FilterEnvAmount => Some(self.filter_env_amount.into()),

            ParamId::AmpAttack => Some(self.amp_env.attack.into()),
            ParamId::AmpDecay => Some(self.amp_env.decay.into()),
            ParamId::AmpSustain => Some(self.amp_env.sustain.into()),
            ParamId::AmpRelease => Some(self.amp_env.release.into()),
            ParamId::AmpVelocity => Some(self.amp_env.velocity_sensitivity.into()),
            ParamId::AmpRetrigger => Some(self.amp_env.retrigger.into()),
            ParamId::AmpLoop => Some(self.amp_env.looping.into()),
            ParamId::FilterEnvAttack => Some(self.filter_env.attack.into()),
            ParamId::FilterEnvDecay => Some(self.filter_env.decay.into()),
            ParamId::FilterEnvSustain => Some(self.filter_env.sustain.into()),
            ParamId::FilterEnvRelease => Some(self.filter_env.release.into()),
            ParamId::FilterEnvVelocity => Some(self.filter_env.velocity_sensitivity.into()),
            ParamId::FilterEnvRetrigger => Some(self.filter_env.retrigger.into()),
            ParamId::FilterEnvLoop => Some(self.filter_env.looping.into()),
            ParamId::PitchEnvAttack => Some(self.pitch_env.attack.into()),
            ParamId::PitchEnvDecay => Some(self.pitch_env.decay.into()),
            ParamId::PitchEnvSustain => Some(self.pitch_env.sustain.into()),
            ParamId::PitchEnvRelease => Some(self.pitch_env.release.into()),
            ParamId::PitchEnvVelocity => Some(self.pitch_env.velocity_sensitivity.into()),
            ParamId::PitchEnvRetrigger => Some(self.pitch_env.retrigger.into()),
            ParamId::PitchEnvLoop => Some(self.pitch_env.looping.into()),
            ParamId::PitchEnvAmount => Some(self.pitch_env_amount.into()),

            ParamId::VoiceMode => Some(self.voice_mode.index().into()),
            ParamId::GlideTime => Some(self.glide_time.into()),
            ParamId::PitchBendRange => Some(self.pitch_bend_range.into()),

            ParamId::LfoWaveform(i) => lfo(i).map(|l| l.waveform.index().into()),
            ParamId::LfoRate(i) => lfo(i).map(|l| l.rate_hz.into()),
            ParamId::LfoSync(i) => lfo(i).map(|l| l.sync.map_or(-1, NoteDivision::index).into()),
            ParamId::LfoDepth(i) => lfo(i).map(|l| l.depth.into()),
            ParamId::LfoKeySync(i) => lfo(i).map(|l| l.key_sync.into()),
            ParamId::LfoFadeIn(i) => lfo(i).map(|l| l.fade_in.into()),

            ParamId::ModSource(i) => slot(i).map(|s| s.source.index().into()),
            ParamId::ModDestination(i) => slot(i).map(|s| s.destination.index().into()),
            ParamId::ModAmount(i) => slot(i).map(|s| s.amount.into()),

            ParamId::DistortionEnabled => Some(fx.distortion.enabled.into()),
            ParamId::DistortionDrive => Some(fx.distortion.drive.into()),
            ParamId::DistortionMix => Some(fx.distortion.mix.into()),
            ParamId::ChorusEnabled => Some(fx.chorus.enabled.into()),
            ParamId::ChorusRate => Some(fx.chorus.rate.into()),
            ParamId::ChorusDepth => Some(fx.chorus.depth.into()),
            ParamId::ChorusMix => Some(fx.chorus.mix.into()),
            ParamId::DelayEnabled => Some(fx.delay.enabled.into()),
            ParamId::DelayTime => Some(fx.delay.time.into()),
            ParamId::DelaySync => Some(fx.delay.sync.map_or(-1, NoteDivision::index).into()),
            ParamId::DelayFeedback => Some(fx.delay.feedback.into()),
            ParamId::DelayTone => Some(fx.delay.tone.into()),
            ParamId::DelayMix => Some(fx.delay.mix.into()),
            ParamId::ReverbEnabled => Some(fx.reverb.enabled.into()),
            ParamId::ReverbSize => Some(fx.reverb.size.into()),
            ParamId::ReverbDamping => Some(fx.reverb.damping.into()),
            ParamId::ReverbMix => Some(fx.reverb.mix.into()),
            ParamId::CompressorEnabled => Some(fx.compressor.enabled.into()),
            ParamId::CompressorThreshold => Some(fx.compressor.threshold.into()),
            ParamId::CompressorRatio => Some(fx.compressor.ratio.into()),
            ParamId::CompressorAttack => Some(fx.compressor.attack.into()),
            ParamId::CompressorRelease => Some(fx.compressor.release.into()),
            ParamId::CompressorMakeup => Some(fx.compressor.makeup.into()),

            ParamId::ArpEnabled => Some(self.arp.enabled.into()),
            ParamId::ArpMode => Some(self.arp.mode.index().into()),
            ParamId::ArpRate => Some(self.arp.rate.into()),
            ParamId::ArpGate => Some(self.arp.gate.into()),
            ParamId::ArpOctaves => Some((self.arp.octaves as i32).into()),
        };

        value.unwrap_or(ParamValue::Float(0.0))
    }

    /// The message list that recreates this patch on a running engine.
    pub fn to_messages(&self) -> Vec<ParamMsg> {
        param_ids()
            .map(|id| ParamMsg {
                id,
                value: self.get(id),
            })
            .collect()
    }
}

#[inline]
fn ranged(value: ParamValue, range: (f32, f32)) -> f32 {
    let x = value.as_float();
    if x.is_nan() {
        range.0
    } else {
        x.clamp(range.0, range.1)
    }
}

#[inline]
fn unit(value: ParamValue) -> f32 {
    ranged(value, (0.0, 1.0))
}

#[inline]
fn unison(value: ParamValue) -> u8 {
    value.as_int().clamp(1, MAX_UNISON as i32) as u8
}
