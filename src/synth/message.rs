#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Control Messages
================

Everything that crosses from a control thread into the audio thread is one
of three small `Copy` records:

  ParamMsg    a single control-surface value change (cutoff, attack, ...)
  MidiEvent   a decoded channel-voice message (see io/midi.rs)
  SeqEvent    a note scheduled at an absolute sample frame

They are built on the producer side, pushed into a fixed-capacity queue,
and consumed exactly once by the engine at the start of a block. Nothing
in them points back into engine state, so they are immutable once queued.


Parameter Values
----------------

A parameter carries one of three payloads. The receiving field decides
which one it wants and converts loosely:

    payload      as_float     as_int         as_bool
    Float(x)     x            round(x)       x != 0
    Int(n)       n            n              n != 0
    Bool(b)      1.0 / 0.0    1 / 0          b

Enum-valued parameters (waveform, filter mode, mod source, ...) travel as
`Int` indices and clamp to the nearest valid variant on arrival.
*/

/// Receives events drained from a queue or produced by the MIDI parser.
///
/// Closures implement this, so ad-hoc consumers can pass `&mut |ev| ...`.
pub trait EventSink<T> {
    fn dispatch(&mut self, event: T);
}

impl<T, F: FnMut(T)> EventSink<T> for F {
    fn dispatch(&mut self, event: T) {
        self(event)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Bool(bool),
}

impl ParamValue {
    pub fn as_float(self) -> f32 {
        match self {
            ParamValue::Float(x) => x,
            ParamValue::Int(n) => n as f32,
            ParamValue::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_int(self) -> i32 {
        match self {
            // NaN rounds to 0 through the saturating cast
            ParamValue::Float(x) => x.round() as i32,
            ParamValue::Int(n) => n,
            ParamValue::Bool(b) => b as i32,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            ParamValue::Float(x) => x != 0.0 && !x.is_nan(),
            ParamValue::Int(n) => n != 0,
            ParamValue::Bool(b) => b,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Every control-surface value the engine understands.
///
/// Indexed variants address one of the four LFOs (`0..4`) or one of the
/// sixteen modulation slots (`0..16`); out-of-range indices are ignored.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    MasterVolume,
    Tempo,
    /// Any value triggers all-notes-off at the start of the next block.
    Panic,

    Osc1Waveform,
    Osc1Unison,
    Osc1Detune,
    Osc1PulseWidth,
    Osc2Waveform,
    Osc2Unison,
    Osc2Detune,
    Osc2PulseWidth,
    Osc2Level,
    Osc2Semitones,
    Osc2Fine,
    HardSync,
    Drift,

    FilterMode,
    FilterCutoff,
    FilterResonance,
    FilterKeyTrack,
    FilterEnvAmount,

    AmpAttack,
    AmpDecay,
    AmpSustain,
    AmpRelease,
    AmpVelocity,
    AmpRetrigger,
    AmpLoop,
    FilterEnvAttack,
    FilterEnvDecay,
    FilterEnvSustain,
    FilterEnvRelease,
    FilterEnvVelocity,
    FilterEnvRetrigger,
    FilterEnvLoop,
    PitchEnvAttack,
    PitchEnvDecay,
    PitchEnvSustain,
    PitchEnvRelease,
    PitchEnvVelocity,
    PitchEnvRetrigger,
    PitchEnvLoop,
    /// Pitch envelope depth in semitones.
    PitchEnvAmount,

    VoiceMode,
    GlideTime,
    PitchBendRange,

    LfoWaveform(u8),
    LfoRate(u8),
    /// Note division index; negative values switch the LFO back to free Hz.
    LfoSync(u8),
    LfoDepth(u8),
    LfoKeySync(u8),
    LfoFadeIn(u8),

    ModSource(u8),
    ModDestination(u8),
    ModAmount(u8),

    DistortionEnabled,
    DistortionDrive,
    DistortionMix,
    ChorusEnabled,
    ChorusRate,
    ChorusDepth,
    ChorusMix,
    DelayEnabled,
    DelayTime,
    DelaySync,
    DelayFeedback,
    DelayTone,
    DelayMix,
    ReverbEnabled,
    ReverbSize,
    ReverbDamping,
    ReverbMix,
    CompressorEnabled,
    CompressorThreshold,
    CompressorRatio,
    CompressorAttack,
    CompressorRelease,
    CompressorMakeup,

    ArpEnabled,
    ArpMode,
    ArpRate,
    ArpGate,
    ArpOctaves,
}

/// One parameter change, as queued by a control thread.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamMsg {
    pub id: ParamId,
    pub value: ParamValue,
}

impl ParamMsg {
    pub fn new(id: ParamId, value: impl Into<ParamValue>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }
}

/// A note trigger scheduled at an absolute sample frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqEvent {
    pub frame: u64,
    pub note: u8,
    pub velocity: u8,
    /// Frames until the matching note-off; zero means no note-off is scheduled.
    pub length_frames: u32,
}
